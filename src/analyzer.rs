//! Structural analysis: quantized brightness maps and rule-of-thirds
//! composition.

use crate::edge_detector::{detect_edges, luma, EdgeMap};
use crate::error::{EngineError, Result};
use crate::raster::{Raster, Rect};
use serde::Serialize;
use tracing::debug;

/// Cells per side of the focal-point density grid.
pub const COMPOSITION_GRID: u32 = 16;
/// Cells denser than this fraction of the densest cell become focal points.
const FOCAL_DENSITY_RATIO: f64 = 0.5;
const MAX_FOCAL_POINTS: usize = 3;

const LEVEL_LABELS: [&str; 5] = ["darkest", "dark", "mid", "light", "lightest"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub level: u16,
    pub label: &'static str,
}

/// Grid of brightness levels in [0, num_levels).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrightnessMap {
    pub width: u32,
    pub height: u32,
    pub num_levels: u16,
    pub levels: Vec<u16>,
    pub legend: Vec<LegendEntry>,
}

impl BrightnessMap {
    #[inline]
    pub fn level_at(&self, x: u32, y: u32) -> u16 {
        self.levels[y as usize * self.width as usize + x as usize]
    }
}

/// Qualitative label of `level` by its rank among `num_levels`.
pub fn level_label(level: u16, num_levels: u16) -> &'static str {
    let rank = if num_levels > 1 {
        level as f64 / (num_levels - 1) as f64
    } else {
        0.0
    };
    let band = ((rank * 5.0).floor() as usize).min(LEVEL_LABELS.len() - 1);
    LEVEL_LABELS[band]
}

/// Downsample to `target_width` × `target_height` and bucket Rec.709 luma
/// into `num_levels` levels.
pub fn brightness_map(
    raster: &Raster,
    target_width: u32,
    target_height: u32,
    num_levels: u16,
) -> Result<BrightnessMap> {
    if target_width == 0 || target_height == 0 {
        return Err(EngineError::validation(
            "target size",
            format!("must be positive, got {}x{}", target_width, target_height),
        ));
    }
    if !(2..=256).contains(&num_levels) {
        return Err(EngineError::validation(
            "num_levels",
            format!("must be in [2, 256], got {}", num_levels),
        ));
    }

    let scaled = raster.resize_bilinear(target_width, target_height)?;
    let top = num_levels - 1;
    let levels: Vec<u16> = scaled
        .pixels
        .iter()
        .map(|p| {
            let level = (luma(p) / 256.0 * num_levels as f64).floor() as u16;
            level.min(top)
        })
        .collect();

    let legend = (0..num_levels)
        .map(|level| LegendEntry {
            level,
            label: level_label(level, num_levels),
        })
        .collect();

    Ok(BrightnessMap {
        width: target_width,
        height: target_height,
        num_levels,
        levels,
        legend,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
    /// Edge density relative to the densest grid cell, [0, 1].
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThirdsIntersection {
    pub x: f64,
    pub y: f64,
    pub has_focal_point: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub width: u32,
    pub height: u32,
    /// Sorted by descending weight, at most three.
    pub focal_points: Vec<FocalPoint>,
    /// x positions of the two vertical thirds lines.
    pub vertical_lines: [f64; 2],
    /// y positions of the two horizontal thirds lines.
    pub horizontal_lines: [f64; 2],
    pub intersections: Vec<ThirdsIntersection>,
    /// Thirds cell with the highest edge density.
    pub dominant_region: Rect,
}

/// Edge density inside a rectangle of the edge map.
fn edge_density(edges: &EdgeMap, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
    let area = (x1 - x0) as usize * (y1 - y0) as usize;
    if area == 0 {
        return 0.0;
    }
    let mut count = 0usize;
    for y in y0..y1 {
        for x in x0..x1 {
            if edges.is_edge(x, y) {
                count += 1;
            }
        }
    }
    count as f64 / area as f64
}

/// Bounds of cell `i` when `extent` is cut into `parts` pieces.
#[inline]
fn cell_span(extent: u32, parts: u32, i: u32) -> (u32, u32) {
    let start = (extent as u64 * i as u64 / parts as u64) as u32;
    let end = (extent as u64 * (i + 1) as u64 / parts as u64) as u32;
    (start, end)
}

/// Rule-of-thirds analysis of an already computed edge map.
pub fn composition_from_edges(edges: &EdgeMap) -> Composition {
    let w = edges.width;
    let h = edges.height;

    let mut cells: Vec<FocalPoint> = Vec::new();
    let mut max_density = 0.0f64;
    for gy in 0..COMPOSITION_GRID {
        let (y0, y1) = cell_span(h, COMPOSITION_GRID, gy);
        for gx in 0..COMPOSITION_GRID {
            let (x0, x1) = cell_span(w, COMPOSITION_GRID, gx);
            let density = edge_density(edges, x0, y0, x1, y1);
            if density > 0.0 {
                max_density = max_density.max(density);
                cells.push(FocalPoint {
                    x: (x0 + x1) as f64 / 2.0,
                    y: (y0 + y1) as f64 / 2.0,
                    weight: density,
                });
            }
        }
    }

    let mut focal_points: Vec<FocalPoint> = if max_density > 0.0 {
        cells
            .into_iter()
            .filter(|c| c.weight > FOCAL_DENSITY_RATIO * max_density)
            .map(|c| FocalPoint {
                weight: c.weight / max_density,
                ..c
            })
            .collect()
    } else {
        Vec::new()
    };
    focal_points.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    focal_points.truncate(MAX_FOCAL_POINTS);

    let vertical_lines = [w as f64 / 3.0, 2.0 * w as f64 / 3.0];
    let horizontal_lines = [h as f64 / 3.0, 2.0 * h as f64 / 3.0];
    let near = w as f64 / 6.0;

    let mut intersections = Vec::with_capacity(4);
    for &y in &horizontal_lines {
        for &x in &vertical_lines {
            let has_focal_point = focal_points.iter().any(|f| {
                let dx = f.x - x;
                let dy = f.y - y;
                (dx * dx + dy * dy).sqrt() <= near
            });
            intersections.push(ThirdsIntersection {
                x,
                y,
                has_focal_point,
            });
        }
    }

    let mut dominant_region = {
        let (x0, x1) = cell_span(w, 3, 1);
        let (y0, y1) = cell_span(h, 3, 1);
        Rect { x: x0, y: y0, width: x1 - x0, height: y1 - y0 }
    };
    let mut best = 0.0f64;
    for ty in 0..3 {
        let (y0, y1) = cell_span(h, 3, ty);
        for tx in 0..3 {
            let (x0, x1) = cell_span(w, 3, tx);
            let density = edge_density(edges, x0, y0, x1, y1);
            if density > best {
                best = density;
                dominant_region = Rect { x: x0, y: y0, width: x1 - x0, height: y1 - y0 };
            }
        }
    }

    debug!(
        focal_points = focal_points.len(),
        max_density,
        "analyzed composition"
    );

    Composition {
        width: w,
        height: h,
        focal_points,
        vertical_lines,
        horizontal_lines,
        intersections,
        dominant_region,
    }
}

/// Detect edges at full resolution with `edge_threshold` and analyze the
/// composition.
pub fn analyze_composition(raster: &Raster, edge_threshold: f64) -> Result<Composition> {
    let edges = detect_edges(raster, edge_threshold, None)?;
    Ok(composition_from_edges(&edges))
}
