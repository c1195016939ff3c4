//! Sobel edge detection and major-edge extraction.
//!
//! Produces a binary edge grid plus the contiguous horizontal and vertical
//! runs long enough to count as structural edges.

use crate::error::{EngineError, Result};
use crate::raster::Raster;
use rgb::RGBA8;
use serde::Serialize;
use tracing::debug;

/// Shortest row/column run of edge pixels reported as a major edge.
pub const MIN_EDGE_RUN: usize = 5;

/// Largest possible Sobel magnitude on 8-bit input: sqrt(2 × (4 × 255)²).
const MAX_SOBEL_MAGNITUDE: f64 = 1442.497_833_620_557_8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrientation {
    Horizontal,
    Vertical,
}

/// A straight run of edge pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MajorEdge {
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub orientation: EdgeOrientation,
    /// Mean gradient magnitude over the run, scaled to [0, 100].
    pub strength: f64,
}

/// Edge detection result: binary grid (1 = edge) plus major edges.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    #[serde(skip)]
    pub magnitudes: Vec<f64>,
    pub edge_pixel_count: usize,
    pub major_edges: Vec<MajorEdge>,
}

impl EdgeMap {
    #[inline]
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }
}

/// Rec.709 luma of one pixel.
#[inline]
pub fn luma(p: &RGBA8) -> f64 {
    0.2126 * p.r as f64 + 0.7152 * p.g as f64 + 0.0722 * p.b as f64
}

/// Sobel gradient magnitude per pixel; the 1-pixel border stays 0.
pub fn sobel_magnitudes(raster: &Raster) -> Vec<f64> {
    let w = raster.width as usize;
    let h = raster.height as usize;

    let gray: Vec<f64> = raster.pixels.iter().map(luma).collect();
    let mut magnitudes = vec![0.0f64; w * h];
    if w < 3 || h < 3 {
        return magnitudes;
    }

    let sobel_x: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    let sobel_y: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            let mut gx = 0.0;
            let mut gy = 0.0;

            for ky in 0..3usize {
                for kx in 0..3usize {
                    let px = x + kx - 1;
                    let py = y + ky - 1;
                    let pixel = gray[py * w + px];
                    let idx = ky * 3 + kx;
                    gx += pixel * sobel_x[idx];
                    gy += pixel * sobel_y[idx];
                }
            }

            magnitudes[y * w + x] = (gx * gx + gy * gy).sqrt();
        }
    }

    magnitudes
}

/// Detect edges, optionally after a bilinear downsample to `target`.
///
/// A pixel is an edge when its Sobel magnitude exceeds `threshold`
/// (0-255). Major edges are scanned row by row, then column by column.
pub fn detect_edges(
    raster: &Raster,
    threshold: f64,
    target: Option<(u32, u32)>,
) -> Result<EdgeMap> {
    if !(0.0..=255.0).contains(&threshold) {
        return Err(EngineError::validation(
            "threshold",
            format!("must be in [0, 255], got {}", threshold),
        ));
    }
    if raster.is_empty() {
        return Err(EngineError::degenerate("cannot detect edges on a zero-area raster"));
    }

    let working;
    let source = match target {
        Some((tw, th)) => {
            working = raster.resize_bilinear(tw, th)?;
            &working
        }
        None => raster,
    };

    let magnitudes = sobel_magnitudes(source);
    let data: Vec<u8> = magnitudes.iter().map(|&m| (m > threshold) as u8).collect();
    let edge_pixel_count = data.iter().filter(|&&v| v != 0).count();

    let mut map = EdgeMap {
        width: source.width,
        height: source.height,
        data,
        magnitudes,
        edge_pixel_count,
        major_edges: Vec::new(),
    };
    map.major_edges = find_major_edges(&map);

    debug!(
        width = map.width,
        height = map.height,
        edge_pixels = map.edge_pixel_count,
        major_edges = map.major_edges.len(),
        "detected edges"
    );
    Ok(map)
}

fn run_strength(magnitudes: &[f64]) -> f64 {
    let mean = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
    (mean / MAX_SOBEL_MAGNITUDE * 100.0).clamp(0.0, 100.0)
}

/// Runs of at least [`MIN_EDGE_RUN`] edge pixels along each row and column.
pub fn find_major_edges(map: &EdgeMap) -> Vec<MajorEdge> {
    let w = map.width as usize;
    let h = map.height as usize;
    let mut edges = Vec::new();

    let mut run: Vec<f64> = Vec::new();
    for y in 0..h {
        run.clear();
        for x in 0..=w {
            if x < w && map.data[y * w + x] != 0 {
                run.push(map.magnitudes[y * w + x]);
                continue;
            }
            if run.len() >= MIN_EDGE_RUN {
                edges.push(MajorEdge {
                    start: ((x - run.len()) as u32, y as u32),
                    end: ((x - 1) as u32, y as u32),
                    orientation: EdgeOrientation::Horizontal,
                    strength: run_strength(&run),
                });
            }
            run.clear();
        }
    }

    for x in 0..w {
        run.clear();
        for y in 0..=h {
            if y < h && map.data[y * w + x] != 0 {
                run.push(map.magnitudes[y * w + x]);
                continue;
            }
            if run.len() >= MIN_EDGE_RUN {
                edges.push(MajorEdge {
                    start: (x as u32, (y - run.len()) as u32),
                    end: (x as u32, (y - 1) as u32),
                    orientation: EdgeOrientation::Vertical,
                    strength: run_strength(&run),
                });
            }
            run.clear();
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: RGBA8 = RGBA8 { r: 0, g: 0, b: 0, a: 255 };
    const WHITE: RGBA8 = RGBA8 { r: 255, g: 255, b: 255, a: 255 };

    fn vertical_split(width: u32, height: u32, split: u32) -> Raster {
        let mut raster = Raster::filled(width, height, BLACK);
        for y in 0..height {
            for x in split..width {
                raster.set(x, y, WHITE);
            }
        }
        raster
    }

    #[test]
    fn test_sobel_detects_vertical_edge() {
        let img = vertical_split(10, 10, 5);
        let edges = detect_edges(&img, 50.0, None).unwrap();
        assert_eq!(edges.width, 10);
        assert_eq!(edges.height, 10);
        assert!(edges.is_edge(5, 5));
        assert!(edges.is_edge(4, 5));
        assert!(!edges.is_edge(2, 5));
        assert!(!edges.is_edge(7, 5));
    }

    #[test]
    fn test_sobel_uniform_image_no_edges() {
        let img = Raster::filled(10, 10, RGBA8::new(128, 128, 128, 255));
        let edges = detect_edges(&img, 0.0, None).unwrap();
        assert!(edges.data.iter().all(|&v| v == 0));
        assert_eq!(edges.edge_pixel_count, 0);
        assert!(edges.major_edges.is_empty());
    }

    #[test]
    fn test_sobel_horizontal_edge() {
        let mut img = Raster::filled(10, 10, BLACK);
        for y in 5..10 {
            for x in 0..10 {
                img.set(x, y, WHITE);
            }
        }
        let edges = detect_edges(&img, 50.0, None).unwrap();
        assert!(edges.is_edge(5, 5));
        assert!(edges.is_edge(5, 4));
    }

    #[test]
    fn test_border_pixels_never_edges() {
        let img = vertical_split(10, 10, 5);
        let edges = detect_edges(&img, 0.0, None).unwrap();
        for x in 0..10 {
            assert!(!edges.is_edge(x, 0));
            assert!(!edges.is_edge(x, 9));
        }
    }

    #[test]
    fn test_rectangle_boundary_concentrates_edges() {
        let mut img = Raster::filled(20, 20, BLACK);
        for y in 5..15 {
            for x in 5..15 {
                img.set(x, y, WHITE);
            }
        }
        let edges = detect_edges(&img, 100.0, None).unwrap();
        assert!(edges.edge_pixel_count > 0);
        for y in 0..20u32 {
            for x in 0..20u32 {
                if edges.is_edge(x, y) {
                    let near_x = (3..=15).contains(&x) && (x <= 6 || x >= 13);
                    let near_y = (3..=15).contains(&y) && (y <= 6 || y >= 13);
                    assert!(near_x || near_y, "stray edge at ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_major_edges_from_vertical_split() {
        let img = vertical_split(12, 12, 6);
        let edges = detect_edges(&img, 50.0, None).unwrap();
        let vertical: Vec<_> = edges
            .major_edges
            .iter()
            .filter(|e| e.orientation == EdgeOrientation::Vertical)
            .collect();
        // Columns 5 and 6 each carry a run over rows 1..=10
        assert_eq!(vertical.len(), 2);
        for e in &vertical {
            assert_eq!(e.start.1, 1);
            assert_eq!(e.end.1, 10);
            assert!(e.strength > 0.0 && e.strength <= 100.0);
        }
        // Rows only ever hold 2 edge pixels side by side
        assert!(edges
            .major_edges
            .iter()
            .all(|e| e.orientation == EdgeOrientation::Vertical));
    }

    #[test]
    fn test_strength_of_full_contrast_step() {
        // Black→white step: |Gx| = 4 × 255 on both sides of the boundary
        let img = vertical_split(12, 12, 6);
        let edges = detect_edges(&img, 50.0, None).unwrap();
        let expected = 4.0 * 255.0 / MAX_SOBEL_MAGNITUDE * 100.0;
        for e in &edges.major_edges {
            assert!((e.strength - expected).abs() < 0.01, "{}", e.strength);
        }
    }

    #[test]
    fn test_downsample_target() {
        let img = vertical_split(40, 40, 20);
        let edges = detect_edges(&img, 50.0, Some((10, 10))).unwrap();
        assert_eq!(edges.width, 10);
        assert_eq!(edges.data.len(), 100);
        assert!(edges.edge_pixel_count > 0);
    }

    #[test]
    fn test_threshold_validation() {
        let img = Raster::filled(4, 4, BLACK);
        assert!(detect_edges(&img, -1.0, None).is_err());
        assert!(detect_edges(&img, 256.0, None).is_err());
        assert!(detect_edges(&img, 0.0, Some((0, 4))).is_err());
    }

    #[test]
    fn test_tiny_raster_has_no_interior() {
        let img = Raster::filled(2, 2, WHITE);
        let edges = detect_edges(&img, 0.0, None).unwrap();
        assert_eq!(edges.edge_pixel_count, 0);
    }
}
