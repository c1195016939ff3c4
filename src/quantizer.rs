//! Color quantization: median cut, k-means (RGB) and octree.

use crate::error::{EngineError, Result};
use crate::kmeans;
use crate::octree::octree_quantize;
use crate::raster::Raster;
use crate::sampler::{sample, DEFAULT_MAX_SAMPLES};
use rand::Rng;
use rgb::RGBA8;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantizeAlgorithm {
    MedianCut,
    KMeans,
    Octree,
}

impl QuantizeAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantizeAlgorithm::MedianCut => "median_cut",
            QuantizeAlgorithm::KMeans => "kmeans",
            QuantizeAlgorithm::Octree => "octree",
        }
    }
}

impl fmt::Display for QuantizeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantizeAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "median_cut" => Ok(QuantizeAlgorithm::MedianCut),
            "kmeans" => Ok(QuantizeAlgorithm::KMeans),
            "octree" => Ok(QuantizeAlgorithm::Octree),
            other => Err(EngineError::validation(
                "algorithm",
                format!("expected median_cut, kmeans or octree, got {:?}", other),
            )),
        }
    }
}

/// Options for [`quantize`]
#[derive(Debug, Clone)]
pub struct QuantizeOptions {
    /// Palette size, 2-256 (default: 16)
    pub target_colors: usize,
    /// Reduction algorithm (default: median cut)
    pub algorithm: QuantizeAlgorithm,
    /// Ignore fully transparent pixels and keep a transparent entry (default: true)
    pub preserve_transparency: bool,
    /// Sample cap (default: 10,000)
    pub max_samples: usize,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            target_colors: 16,
            algorithm: QuantizeAlgorithm::MedianCut,
            preserve_transparency: true,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantizeResult {
    pub palette: Vec<RGBA8>,
    /// Distinct colors in the full raster (non-transparent ones only when
    /// preserving transparency).
    pub original_color_count: usize,
}

#[inline]
fn color_key(c: &RGBA8) -> u32 {
    (c.r as u32) << 24 | (c.g as u32) << 16 | (c.b as u32) << 8 | c.a as u32
}

/// Distinct RGB triples; the reducers split on RGB only.
fn count_distinct_rgb(pixels: &[RGBA8]) -> usize {
    pixels
        .iter()
        .map(|c| color_key(&RGBA8::new(c.r, c.g, c.b, 0)))
        .collect::<HashSet<_>>()
        .len()
}

/// Count distinct RGBA colors, optionally skipping fully transparent pixels.
pub fn count_distinct_colors(pixels: &[RGBA8], skip_transparent: bool) -> usize {
    pixels
        .iter()
        .filter(|p| !skip_transparent || p.a > 0)
        .map(color_key)
        .collect::<HashSet<_>>()
        .len()
}

/// Reduce `raster` to at most `options.target_colors` colors.
///
/// The reducers split on RGB and give each entry the mean alpha of the pixels
/// it stands for, so the target is capped at the number of distinct sampled
/// RGB triples, never padded. With `preserve_transparency`, fully transparent
/// pixels are left out of the reduction and, if the raster has any, a
/// transparent entry takes one of the `target_colors` slots.
pub fn quantize<R: Rng + ?Sized>(
    raster: &Raster,
    options: &QuantizeOptions,
    rng: &mut R,
) -> Result<QuantizeResult> {
    if !(2..=256).contains(&options.target_colors) {
        return Err(EngineError::validation(
            "target_colors",
            format!("must be in [2, 256], got {}", options.target_colors),
        ));
    }

    let mut samples = sample(raster, options.max_samples)?;
    if options.preserve_transparency {
        samples.retain(|p| p.a > 0);
    }
    if samples.is_empty() {
        return Err(EngineError::degenerate("no non-transparent pixels to quantize"));
    }

    let transparent_entry =
        options.preserve_transparency && raster.pixels.iter().any(|p| p.a == 0);
    let opaque_budget = if transparent_entry {
        options.target_colors - 1
    } else {
        options.target_colors
    };
    let target = opaque_budget.min(count_distinct_rgb(&samples));

    let mut palette = match options.algorithm {
        QuantizeAlgorithm::MedianCut => median_cut(&samples, target),
        QuantizeAlgorithm::KMeans => kmeans_rgb(&samples, target, rng),
        QuantizeAlgorithm::Octree => octree_quantize(&samples, target),
    };

    let mut seen = HashSet::new();
    palette.retain(|c| seen.insert(color_key(c)));

    if transparent_entry {
        palette.insert(0, RGBA8::new(0, 0, 0, 0));
    }

    let original_color_count = count_distinct_colors(&raster.pixels, options.preserve_transparency);

    debug!(
        algorithm = %options.algorithm,
        target,
        produced = palette.len(),
        original_color_count,
        "quantized raster"
    );

    Ok(QuantizeResult {
        palette,
        original_color_count,
    })
}

/// Sum of the per-channel RGB ranges of a bucket.
pub fn bucket_range(colors: &[RGBA8]) -> u32 {
    let [rr, gr, br] = channel_ranges(colors);
    rr as u32 + gr as u32 + br as u32
}

fn channel_ranges(colors: &[RGBA8]) -> [u8; 3] {
    let (mut rmin, mut rmax) = (255u8, 0u8);
    let (mut gmin, mut gmax) = (255u8, 0u8);
    let (mut bmin, mut bmax) = (255u8, 0u8);
    for c in colors {
        rmin = rmin.min(c.r);
        rmax = rmax.max(c.r);
        gmin = gmin.min(c.g);
        gmax = gmax.max(c.g);
        bmin = bmin.min(c.b);
        bmax = bmax.max(c.b);
    }
    if colors.is_empty() {
        return [0, 0, 0];
    }
    [rmax - rmin, gmax - gmin, bmax - bmin]
}

#[inline]
fn channel(c: &RGBA8, axis: usize) -> u8 {
    match axis {
        0 => c.r,
        1 => c.g,
        _ => c.b,
    }
}

/// Split a bucket at the median of its widest channel.
///
/// The cut is moved to the nearest value boundary so that one color never
/// lands in both halves. Returns `None` for a bucket with zero range.
pub fn split_bucket(mut colors: Vec<RGBA8>) -> Option<(Vec<RGBA8>, Vec<RGBA8>)> {
    let ranges = channel_ranges(&colors);
    let axis = if ranges[0] >= ranges[1] && ranges[0] >= ranges[2] {
        0
    } else if ranges[1] >= ranges[2] {
        1
    } else {
        2
    };
    if ranges[axis] == 0 {
        return None;
    }

    colors.sort_by_key(|c| channel(c, axis));

    let mid = colors.len() / 2;
    let median = channel(&colors[mid], axis);
    let first_at_median = colors.partition_point(|c| channel(c, axis) < median);
    let cut = if first_at_median > 0 {
        first_at_median
    } else {
        colors.partition_point(|c| channel(c, axis) <= median)
    };

    let right = colors.split_off(cut);
    Some((colors, right))
}

/// Channel mean of a bucket, truncated toward zero.
pub fn bucket_average(colors: &[RGBA8]) -> RGBA8 {
    if colors.is_empty() {
        return RGBA8::new(0, 0, 0, 255);
    }
    let (mut sr, mut sg, mut sb, mut sa) = (0u64, 0u64, 0u64, 0u64);
    for c in colors {
        sr += c.r as u64;
        sg += c.g as u64;
        sb += c.b as u64;
        sa += c.a as u64;
    }
    let n = colors.len() as u64;
    RGBA8::new((sr / n) as u8, (sg / n) as u8, (sb / n) as u8, (sa / n) as u8)
}

/// Median cut: keep splitting the widest bucket until `num_colors` buckets
/// exist or every bucket is a single color.
pub fn median_cut(samples: &[RGBA8], num_colors: usize) -> Vec<RGBA8> {
    if num_colors == 0 || samples.is_empty() {
        return Vec::new();
    }

    let mut buckets: Vec<Vec<RGBA8>> = vec![samples.to_vec()];
    while buckets.len() < num_colors {
        let mut best_idx = 0;
        let mut best_range = 0u32;
        for (i, b) in buckets.iter().enumerate() {
            let range = bucket_range(b);
            if range > best_range {
                best_range = range;
                best_idx = i;
            }
        }
        if best_range == 0 {
            break;
        }

        let to_split = buckets.swap_remove(best_idx);
        match split_bucket(to_split) {
            Some((a, b)) => {
                buckets.push(a);
                buckets.push(b);
            }
            None => break,
        }
    }

    buckets.iter().map(|b| bucket_average(b)).collect()
}

/// k-means directly in RGB space. Each centroid takes the mean alpha of its
/// members.
pub fn kmeans_rgb<R: Rng + ?Sized>(
    samples: &[RGBA8],
    num_colors: usize,
    rng: &mut R,
) -> Vec<RGBA8> {
    let points: Vec<kmeans::Point3> = samples
        .iter()
        .map(|c| [c.r as f64, c.g as f64, c.b as f64])
        .collect();
    let clustering = kmeans::cluster(&points, num_colors, rng);

    let mut alpha_sums = vec![0u64; clustering.centroids.len()];
    for (c, &a) in samples.iter().zip(clustering.assignments.iter()) {
        alpha_sums[a] += c.a as u64;
    }

    clustering
        .centroids
        .iter()
        .zip(alpha_sums.iter().zip(clustering.counts.iter()))
        .map(|(c, (&alpha_sum, &n))| {
            let alpha = if n > 0 { (alpha_sum / n as u64) as u8 } else { 255 };
            RGBA8::new(
                c[0].round().clamp(0.0, 255.0) as u8,
                c[1].round().clamp(0.0, 255.0) as u8,
                c[2].round().clamp(0.0, 255.0) as u8,
                alpha,
            )
        })
        .collect()
}
