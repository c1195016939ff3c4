//! Flood-fill segmentation into similar-color regions for auto-shading.

use crate::raster::{Raster, Rect};
use crate::shading::Vector3;
use rgb::RGBA8;
use std::collections::VecDeque;

/// Regions smaller than this are dropped.
pub const MIN_REGION_PIXELS: usize = 4;

/// Squared RGBA distance (channels widened to 16 bits) allowed between a
/// pixel and its region's seed.
pub const DEFAULT_REGION_TOLERANCE: u64 = 2000;

/// A connected group of similar pixels.
#[derive(Debug, Clone)]
pub struct ShadingRegion {
    pub bounds: Rect,
    /// Color of the seed pixel.
    pub base_color: RGBA8,
    pub pixels: Vec<(u32, u32)>,
    pub normal: Vector3,
}

impl ShadingRegion {
    /// Centre of the bounding box in pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.bounds.x as f64 + (self.bounds.width as f64 - 1.0) / 2.0,
            self.bounds.y as f64 + (self.bounds.height as f64 - 1.0) / 2.0,
        )
    }

    /// Half the larger bounding-box dimension.
    pub fn radius(&self) -> f64 {
        self.bounds.width.max(self.bounds.height) as f64 / 2.0
    }
}

#[inline]
fn widen(c: u8) -> i64 {
    c as i64 * 257
}

/// Squared RGBA distance over 16-bit-widened channels.
#[inline]
pub fn color_distance_sq(a: &RGBA8, b: &RGBA8) -> u64 {
    let dr = widen(a.r) - widen(b.r);
    let dg = widen(a.g) - widen(b.g);
    let db = widen(a.b) - widen(b.b);
    let da = widen(a.a) - widen(b.a);
    (dr * dr + dg * dg + db * db + da * da) as u64
}

/// Segment `raster` into 4-connected regions of pixels within `tolerance` of
/// their seed. Transparent pixels are never grouped.
pub fn segment_regions(raster: &Raster, tolerance: u64) -> Vec<ShadingRegion> {
    let w = raster.width as usize;
    let h = raster.height as usize;
    let mut visited = vec![false; w * h];
    let mut regions = Vec::new();

    for y in 0..h {
        let row_offset = y * w;
        for x in 0..w {
            let idx = row_offset + x;
            if visited[idx] || raster.pixels[idx].a == 0 {
                continue;
            }

            let seed = raster.pixels[idx];
            let region_pixels =
                flood_fill_by_color(raster, x as u32, y as u32, &seed, tolerance, &mut visited);

            if region_pixels.len() < MIN_REGION_PIXELS {
                continue;
            }

            regions.push(ShadingRegion {
                bounds: bounding_rect(&region_pixels),
                base_color: seed,
                pixels: region_pixels,
                normal: Vector3::new(0.0, 0.0, 1.0),
            });
        }
    }

    regions
}

/// 4-connectivity flood fill from (start_x, start_y) over pixels close to `seed`.
fn flood_fill_by_color(
    raster: &Raster,
    start_x: u32,
    start_y: u32,
    seed: &RGBA8,
    tolerance: u64,
    visited: &mut [bool],
) -> Vec<(u32, u32)> {
    let w = raster.width as usize;
    let iw = raster.width as i64;
    let ih = raster.height as i64;

    let mut region = Vec::new();
    let mut queue = VecDeque::new();

    queue.push_back((start_x, start_y));
    visited[start_y as usize * w + start_x as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        region.push((x, y));

        for (dx, dy) in [(0i64, 1i64), (1, 0), (0, -1), (-1, 0)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || nx >= iw || ny < 0 || ny >= ih {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if visited[nidx] {
                continue;
            }
            let p = &raster.pixels[nidx];
            if p.a != 0 && color_distance_sq(p, seed) <= tolerance {
                visited[nidx] = true;
                queue.push_back((nx as u32, ny as u32));
            }
        }
    }

    region
}

fn bounding_rect(pixels: &[(u32, u32)]) -> Rect {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    for &(x, y) in pixels {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if pixels.is_empty() {
        return Rect { x: 0, y: 0, width: 0, height: 0 };
    }
    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: RGBA8 = RGBA8 { r: 255, g: 0, b: 0, a: 255 };
    const BLUE: RGBA8 = RGBA8 { r: 0, g: 0, b: 255, a: 255 };
    const CLEAR: RGBA8 = RGBA8 { r: 0, g: 0, b: 0, a: 0 };

    #[test]
    fn test_flood_fill_single_region() {
        let raster = Raster::filled(4, 4, RED);
        let mut visited = vec![false; 16];
        let region =
            flood_fill_by_color(&raster, 0, 0, &RED, DEFAULT_REGION_TOLERANCE, &mut visited);
        assert_eq!(region.len(), 16);
        assert!(visited.iter().all(|v| *v));
    }

    #[test]
    fn test_two_halves_two_regions() {
        let mut raster = Raster::filled(4, 4, RED);
        for y in 0..4 {
            for x in 2..4 {
                raster.set(x, y, BLUE);
            }
        }
        let regions = segment_regions(&raster, DEFAULT_REGION_TOLERANCE);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].base_color, RED);
        assert_eq!(regions[0].pixels.len(), 8);
        assert_eq!(regions[0].bounds, Rect { x: 0, y: 0, width: 2, height: 4 });
        assert_eq!(regions[1].base_color, BLUE);
        assert_eq!(regions[1].normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_diagonal_neighbors_not_connected() {
        // Checkerboard of red/blue: every pixel isolated under 4-connectivity.
        let mut raster = Raster::filled(4, 4, RED);
        for y in 0..4u32 {
            for x in 0..4u32 {
                if (x + y) % 2 == 1 {
                    raster.set(x, y, BLUE);
                }
            }
        }
        assert!(segment_regions(&raster, DEFAULT_REGION_TOLERANCE).is_empty());
    }

    #[test]
    fn test_small_regions_dropped_and_transparent_ignored() {
        let mut raster = Raster::filled(5, 5, CLEAR);
        // 3-pixel strip: dropped
        for x in 0..3 {
            raster.set(x, 0, RED);
        }
        // 2x2 block: kept
        for y in 3..5 {
            for x in 3..5 {
                raster.set(x, y, BLUE);
            }
        }
        let regions = segment_regions(&raster, DEFAULT_REGION_TOLERANCE);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].base_color, BLUE);
        assert_eq!(regions[0].pixels.len(), 4);
    }

    #[test]
    fn test_tolerance_groups_near_colors() {
        let mut raster = Raster::filled(4, 1, RED);
        raster.set(3, 0, RGBA8::new(250, 0, 0, 255));
        assert_eq!(segment_regions(&raster, DEFAULT_REGION_TOLERANCE).len(), 0);
        let loose = color_distance_sq(&RED, &RGBA8::new(250, 0, 0, 255));
        let regions = segment_regions(&raster, loose);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixels.len(), 4);
    }

    #[test]
    fn test_center_and_radius() {
        let region = ShadingRegion {
            bounds: Rect { x: 2, y: 4, width: 5, height: 3 },
            base_color: RED,
            pixels: Vec::new(),
            normal: Vector3::new(0.0, 0.0, 1.0),
        };
        assert_eq!(region.center(), (4.0, 5.0));
        assert_eq!(region.radius(), 2.5);
    }
}
