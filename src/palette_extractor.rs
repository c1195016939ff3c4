//! Palette extraction: k-means in LAB, ranked and role-tagged.

use crate::color::{lab_to_rgb, rgb_to_hsl, rgb_to_lab, to_hex_rgb, Lab};
use crate::error::{EngineError, Result};
use crate::kmeans;
use crate::raster::Raster;
use crate::sampler::{sample, DEFAULT_MAX_SAMPLES};
use rand::Rng;
use rgb::RGBA8;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Hues closer than this are ordered by lightness instead.
const HUE_TIE_DEGREES: f64 = 5.0;

/// Semantic role of a palette entry, by lightness band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadeRole {
    DarkShadow,
    Shadow,
    Midtone,
    Light,
    Highlight,
}

impl ShadeRole {
    /// Role for a lightness percentage in [0, 100].
    pub fn from_lightness(lightness: f64) -> Self {
        if lightness < 20.0 {
            ShadeRole::DarkShadow
        } else if lightness < 40.0 {
            ShadeRole::Shadow
        } else if lightness < 60.0 {
            ShadeRole::Midtone
        } else if lightness < 80.0 {
            ShadeRole::Light
        } else {
            ShadeRole::Highlight
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShadeRole::DarkShadow => "dark_shadow",
            ShadeRole::Shadow => "shadow",
            ShadeRole::Midtone => "midtone",
            ShadeRole::Light => "light",
            ShadeRole::Highlight => "highlight",
        }
    }
}

impl fmt::Display for ShadeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an extracted palette.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteColor {
    pub color: RGBA8,
    pub hex: String,
    /// Degrees, [0, 360)
    pub hue: f64,
    /// Percent, [0, 100]
    pub saturation: f64,
    /// Percent, [0, 100]
    pub lightness: f64,
    /// Share of the sampled pixels assigned to this entry, [0, 100]
    pub usage_percent: f64,
    pub role: ShadeRole,
}

impl PaletteColor {
    fn from_centroid(lab: &Lab, assigned: usize, total: usize) -> Self {
        let color = lab_to_rgb(lab);
        let hsl = rgb_to_hsl(&color);
        Self {
            color,
            hex: to_hex_rgb(&color),
            hue: hsl.h,
            saturation: hsl.s * 100.0,
            lightness: hsl.l * 100.0,
            usage_percent: assigned as f64 / total as f64 * 100.0,
            role: ShadeRole::from_lightness(hsl.l * 100.0),
        }
    }
}

/// Extract a `k`-color palette from `raster`.
///
/// Samples at most [`DEFAULT_MAX_SAMPLES`] pixels, clusters them in LAB with
/// centroids seeded from `rng`, sorts by hue (lightness within 5° ties) and
/// tags each entry with a [`ShadeRole`]. Fewer than `k` entries come back only
/// when the samples hold fewer than `k` distinct colors.
pub fn extract_palette<R: Rng + ?Sized>(
    raster: &Raster,
    k: usize,
    rng: &mut R,
) -> Result<Vec<PaletteColor>> {
    if !(2..=256).contains(&k) {
        return Err(EngineError::validation(
            "k",
            format!("must be in [2, 256], got {}", k),
        ));
    }

    let samples = sample(raster, DEFAULT_MAX_SAMPLES)?;
    if samples.is_empty() {
        return Err(EngineError::degenerate("no pixels to sample"));
    }

    let points: Vec<kmeans::Point3> = samples.iter().map(|c| rgb_to_lab(c).to_array()).collect();
    let clustering = kmeans::cluster(&points, k, rng);

    let total = samples.len();
    let mut palette: Vec<PaletteColor> = clustering
        .centroids
        .iter()
        .zip(clustering.counts.iter())
        .map(|(c, &n)| PaletteColor::from_centroid(&Lab::from_array(*c), n, total))
        .collect();

    sort_by_hue(&mut palette);

    debug!(
        requested = k,
        extracted = palette.len(),
        iterations = clustering.iterations,
        "extracted palette"
    );
    Ok(palette)
}

#[inline]
fn hue_precedes(a: &PaletteColor, b: &PaletteColor) -> bool {
    if (a.hue - b.hue).abs() < HUE_TIE_DEGREES {
        a.lightness < b.lightness
    } else {
        a.hue < b.hue
    }
}

/// Stable insertion sort: ascending hue, ascending lightness within a tie.
///
/// The 5° tie window is not transitive, so this avoids `sort_by`, which
/// requires a total order.
fn sort_by_hue(palette: &mut [PaletteColor]) {
    for i in 1..palette.len() {
        let mut j = i;
        while j > 0 && hue_precedes(&palette[j], &palette[j - 1]) {
            palette.swap(j, j - 1);
            j -= 1;
        }
    }
}
