//! Auto-shading: segment flat color regions and light each one as a
//! hemisphere with a three-step shadow/base/highlight ramp.

use crate::color::{hsl_to_rgb, rgb_to_hsl, to_hex_rgb, Hsl};
use crate::error::{EngineError, Result};
use crate::raster::Raster;
use crate::region_extractor::{segment_regions, ShadingRegion, DEFAULT_REGION_TOLERANCE};
use rgb::RGBA8;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Largest lightness change applied at full intensity.
const MAX_LIGHTNESS_SHIFT: f64 = 0.3;
/// Hue rotation in degrees applied to shadows (+) and highlights (-).
const HUE_SHIFT_DEGREES: f64 = 10.0;
/// Regions facing the light less than this are left flat (except cell style).
const MIN_FACING: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return *self;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

/// Where the light comes from, in screen space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightDirection {
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl LightDirection {
    pub const ALL: [LightDirection; 8] = [
        LightDirection::TopLeft,
        LightDirection::Top,
        LightDirection::TopRight,
        LightDirection::Left,
        LightDirection::Right,
        LightDirection::BottomLeft,
        LightDirection::Bottom,
        LightDirection::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LightDirection::TopLeft => "top_left",
            LightDirection::Top => "top",
            LightDirection::TopRight => "top_right",
            LightDirection::Left => "left",
            LightDirection::Right => "right",
            LightDirection::BottomLeft => "bottom_left",
            LightDirection::Bottom => "bottom",
            LightDirection::BottomRight => "bottom_right",
        }
    }

    /// Unit vector pointing from the surface toward the light.
    pub fn vector(&self) -> Vector3 {
        let (x, y) = match self {
            LightDirection::TopLeft => (-1.0, -1.0),
            LightDirection::Top => (0.0, -1.0),
            LightDirection::TopRight => (1.0, -1.0),
            LightDirection::Left => (-1.0, 0.0),
            LightDirection::Right => (1.0, 0.0),
            LightDirection::BottomLeft => (-1.0, 1.0),
            LightDirection::Bottom => (0.0, 1.0),
            LightDirection::BottomRight => (1.0, 1.0),
        };
        Vector3::new(x, y, 1.0).normalize()
    }
}

impl fmt::Display for LightDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        LightDirection::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                EngineError::validation("light_direction", format!("unknown direction {:?}", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingStyle {
    /// Three hard bands.
    Cell,
    /// Checkerboard interleave of the two nearest ramp colors.
    Smooth,
    /// Continuous blend of the two nearest ramp colors.
    Soft,
}

impl ShadingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadingStyle::Cell => "cell",
            ShadingStyle::Smooth => "smooth",
            ShadingStyle::Soft => "soft",
        }
    }
}

impl fmt::Display for ShadingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShadingStyle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cell" => Ok(ShadingStyle::Cell),
            "smooth" => Ok(ShadingStyle::Smooth),
            "soft" => Ok(ShadingStyle::Soft),
            other => Err(EngineError::validation(
                "style",
                format!("expected cell, smooth or soft, got {:?}", other),
            )),
        }
    }
}

/// Options for [`shade`]
#[derive(Debug, Clone)]
pub struct ShadingOptions {
    /// Light source direction (default: top left)
    pub light_direction: LightDirection,
    /// Shading strength 0.0-1.0 (default: 0.5)
    pub intensity: f64,
    /// Rendering style (default: cell)
    pub style: ShadingStyle,
    /// Cool shadows and warm highlights (default: true)
    pub hue_shift: bool,
    /// Region grouping tolerance (default: 2000)
    pub tolerance: u64,
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            light_direction: LightDirection::TopLeft,
            intensity: 0.5,
            style: ShadingStyle::Cell,
            hue_shift: true,
            tolerance: DEFAULT_REGION_TOLERANCE,
        }
    }
}

/// Shadow, base and highlight derived from one base color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub shadow: RGBA8,
    pub base: RGBA8,
    pub highlight: RGBA8,
}

impl Ramp {
    pub fn to_hex(&self) -> [String; 3] {
        [
            to_hex_rgb(&self.shadow),
            to_hex_rgb(&self.base),
            to_hex_rgb(&self.highlight),
        ]
    }

    /// The two ramp colors bracketing `factor` and the position between them.
    fn bracket(&self, factor: f64) -> (RGBA8, RGBA8, f64) {
        if factor < 0.5 {
            (self.shadow, self.base, factor / 0.5)
        } else {
            (self.base, self.highlight, ((factor - 0.5) / 0.5).min(1.0))
        }
    }
}

pub fn generate_ramp(base: &RGBA8, intensity: f64, hue_shift: bool) -> Ramp {
    let hsl = rgb_to_hsl(base);
    let delta = MAX_LIGHTNESS_SHIFT * intensity;
    let shift = if hue_shift { HUE_SHIFT_DEGREES } else { 0.0 };

    let shadow = Hsl {
        h: (hsl.h + shift).rem_euclid(360.0),
        s: hsl.s,
        l: (hsl.l - delta).max(0.0),
    };
    let highlight = Hsl {
        h: (hsl.h - shift).rem_euclid(360.0),
        s: hsl.s,
        l: (hsl.l + delta).min(1.0),
    };

    Ramp {
        shadow: hsl_to_rgb(&shadow, base.a),
        base: *base,
        highlight: hsl_to_rgb(&highlight, base.a),
    }
}

/// Hemisphere lighting factor for pixel (x, y) of `region`: 1 at the
/// bounding-box centre falling to 0 at `radius`, 0.5 outside it.
pub fn lighting_factor(region: &ShadingRegion, x: u32, y: u32) -> f64 {
    let (cx, cy) = region.center();
    let dx = x as f64 - cx;
    let dy = y as f64 - cy;
    let d = (dx * dx + dy * dy).sqrt();
    let radius = region.radius();

    if d < radius {
        let norm = d / radius;
        (1.0 - norm * norm).sqrt()
    } else {
        0.5
    }
}

fn lerp_color(a: &RGBA8, b: &RGBA8, t: f64) -> RGBA8 {
    let mix = |p: u8, q: u8| (p as f64 + (q as f64 - p as f64) * t).round().clamp(0.0, 255.0) as u8;
    RGBA8::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
}

/// Color of one pixel under `style`.
pub fn render_pixel(ramp: &Ramp, factor: f64, style: ShadingStyle, x: u32, y: u32) -> RGBA8 {
    match style {
        ShadingStyle::Cell => {
            if factor < 0.3 {
                ramp.shadow
            } else if factor < 0.7 {
                ramp.base
            } else {
                ramp.highlight
            }
        }
        ShadingStyle::Smooth => {
            let (lower, upper, t) = ramp.bracket(factor);
            let take_upper = if t < 1.0 / 3.0 {
                false
            } else if t > 2.0 / 3.0 {
                true
            } else {
                (x + y) % 2 == 0
            };
            if take_upper { upper } else { lower }
        }
        ShadingStyle::Soft => {
            let (lower, upper, t) = ramp.bracket(factor);
            lerp_color(&lower, &upper, t)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShadingResult {
    pub raster: Raster,
    /// Shadow/base/highlight hex triplets, one per distinct base color shaded.
    pub generated_colors: Vec<String>,
    pub regions_shaded: usize,
}

/// Shade every flat region of `raster` under a synthetic light.
pub fn shade(raster: &Raster, options: &ShadingOptions) -> Result<ShadingResult> {
    if !(0.0..=1.0).contains(&options.intensity) {
        return Err(EngineError::validation(
            "intensity",
            format!("must be in [0, 1], got {}", options.intensity),
        ));
    }

    let regions = segment_regions(raster, options.tolerance);
    if regions.is_empty() {
        return Err(EngineError::degenerate("no shadeable regions detected"));
    }

    let light = options.light_direction.vector();
    let mut out = raster.clone();
    let mut ramps: HashMap<RGBA8, Ramp> = HashMap::new();
    let mut generated_colors = Vec::new();
    let mut regions_shaded = 0;

    for region in &regions {
        if region.normal.dot(&light) < MIN_FACING && options.style != ShadingStyle::Cell {
            continue;
        }

        let ramp = *ramps.entry(region.base_color).or_insert_with(|| {
            let ramp = generate_ramp(&region.base_color, options.intensity, options.hue_shift);
            generated_colors.extend(ramp.to_hex());
            ramp
        });

        for &(x, y) in &region.pixels {
            let factor = lighting_factor(region, x, y);
            out.set(x, y, render_pixel(&ramp, factor, options.style, x, y));
        }
        regions_shaded += 1;
    }

    debug!(
        regions = regions.len(),
        regions_shaded,
        ramps = ramps.len(),
        style = %options.style,
        direction = %options.light_direction,
        "shaded raster"
    );

    Ok(ShadingResult {
        raster: out,
        generated_colors,
        regions_shaded,
    })
}
