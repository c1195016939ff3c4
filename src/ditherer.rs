//! Palette remapping: nearest color, Floyd-Steinberg error diffusion, and
//! ordered pattern fills.

use crate::color::{rgb_to_lab, PaletteMatcher};
use crate::error::{EngineError, Result};
use crate::raster::{Raster, Rect};
use rgb::RGBA8;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Remap every pixel of `raster` onto `palette`.
///
/// With `dither` the quantization error is diffused Floyd-Steinberg style;
/// without it each pixel takes its LAB-nearest palette color. Fully
/// transparent pixels pass through untouched in both modes.
pub fn remap(raster: &Raster, palette: &[RGBA8], dither: bool) -> Result<Raster> {
    let matcher = PaletteMatcher::new(palette)?;
    let out = if dither {
        floyd_steinberg(raster, palette, &matcher)
    } else {
        nearest_color(raster, palette, &matcher)
    };
    debug!(
        width = raster.width,
        height = raster.height,
        palette = palette.len(),
        dither,
        "remapped raster"
    );
    Ok(out)
}

fn nearest_color(raster: &Raster, palette: &[RGBA8], matcher: &PaletteMatcher) -> Raster {
    let pixels = raster
        .pixels
        .iter()
        .map(|p| {
            if p.a == 0 {
                *p
            } else {
                palette[matcher.nearest(&rgb_to_lab(p))]
            }
        })
        .collect();

    Raster {
        width: raster.width,
        height: raster.height,
        pixels,
    }
}

/// Error-diffusion weights as (dx, dy, numerator over 16).
const FLOYD_STEINBERG: [(i64, i64, f64); 4] = [
    (1, 0, 7.0),
    (-1, 1, 3.0),
    (0, 1, 5.0),
    (1, 1, 1.0),
];

fn floyd_steinberg(raster: &Raster, palette: &[RGBA8], matcher: &PaletteMatcher) -> Raster {
    let w = raster.width as usize;
    let h = raster.height as usize;

    let mut work: Vec<[f64; 3]> = raster
        .pixels
        .iter()
        .map(|p| [p.r as f64, p.g as f64, p.b as f64])
        .collect();
    let mut pixels = raster.pixels.clone();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if raster.pixels[idx].a == 0 {
                continue;
            }

            let current = work[idx];
            let probe = RGBA8::new(
                current[0].round() as u8,
                current[1].round() as u8,
                current[2].round() as u8,
                255,
            );
            let chosen = palette[matcher.nearest(&rgb_to_lab(&probe))];
            pixels[idx] = chosen;

            let err = [
                current[0] - chosen.r as f64,
                current[1] - chosen.g as f64,
                current[2] - chosen.b as f64,
            ];

            for &(dx, dy, weight) in &FLOYD_STEINBERG {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let target = &mut work[ny as usize * w + nx as usize];
                for ch in 0..3 {
                    target[ch] = (target[ch] + err[ch] * weight / 16.0).clamp(0.0, 255.0);
                }
            }
        }
    }

    Raster {
        width: raster.width,
        height: raster.height,
        pixels,
    }
}

/// Threshold matrices for [`fill_pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherPattern {
    Bayer2x2,
    Bayer4x4,
    Bayer8x8,
    Checkerboard,
    HorizontalLines,
    VerticalLines,
    Diagonal,
}

#[rustfmt::skip]
const BAYER_2: [u8; 4] = [
    0, 2,
    3, 1,
];

#[rustfmt::skip]
const BAYER_4: [u8; 16] = [
     0,  8,  2, 10,
    12,  4, 14,  6,
     3, 11,  1,  9,
    15,  7, 13,  5,
];

#[rustfmt::skip]
const BAYER_8: [u8; 64] = [
     0, 32,  8, 40,  2, 34, 10, 42,
    48, 16, 56, 24, 50, 18, 58, 26,
    12, 44,  4, 36, 14, 46,  6, 38,
    60, 28, 52, 20, 62, 30, 54, 22,
     3, 35, 11, 43,  1, 33,  9, 41,
    51, 19, 59, 27, 49, 17, 57, 25,
    15, 47,  7, 39, 13, 45,  5, 37,
    63, 31, 55, 23, 61, 29, 53, 21,
];

#[rustfmt::skip]
const CHECKERBOARD: [u8; 4] = [
    0, 2,
    2, 0,
];

#[rustfmt::skip]
const HORIZONTAL_LINES: [u8; 16] = [
     0,  0,  0,  0,
     8,  8,  8,  8,
     4,  4,  4,  4,
    12, 12, 12, 12,
];

#[rustfmt::skip]
const VERTICAL_LINES: [u8; 16] = [
    0, 8, 4, 12,
    0, 8, 4, 12,
    0, 8, 4, 12,
    0, 8, 4, 12,
];

#[rustfmt::skip]
const DIAGONAL: [u8; 16] = [
     0,  8,  4, 12,
     8,  4, 12,  0,
     4, 12,  0,  8,
    12,  0,  8,  4,
];

impl DitherPattern {
    pub const ALL: [DitherPattern; 7] = [
        DitherPattern::Bayer2x2,
        DitherPattern::Bayer4x4,
        DitherPattern::Bayer8x8,
        DitherPattern::Checkerboard,
        DitherPattern::HorizontalLines,
        DitherPattern::VerticalLines,
        DitherPattern::Diagonal,
    ];

    /// Matrix size `n` and its `n × n` thresholds in row-major order.
    pub fn matrix(&self) -> (usize, &'static [u8]) {
        match self {
            DitherPattern::Bayer2x2 => (2, &BAYER_2),
            DitherPattern::Bayer4x4 => (4, &BAYER_4),
            DitherPattern::Bayer8x8 => (8, &BAYER_8),
            DitherPattern::Checkerboard => (2, &CHECKERBOARD),
            DitherPattern::HorizontalLines => (4, &HORIZONTAL_LINES),
            DitherPattern::VerticalLines => (4, &VERTICAL_LINES),
            DitherPattern::Diagonal => (4, &DIAGONAL),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DitherPattern::Bayer2x2 => "bayer_2x2",
            DitherPattern::Bayer4x4 => "bayer_4x4",
            DitherPattern::Bayer8x8 => "bayer_8x8",
            DitherPattern::Checkerboard => "checkerboard",
            DitherPattern::HorizontalLines => "horizontal_lines",
            DitherPattern::VerticalLines => "vertical_lines",
            DitherPattern::Diagonal => "diagonal",
        }
    }

    /// Whether pixel (x, y) takes the second color at `density`.
    #[inline]
    pub fn selects_second(&self, x: u32, y: u32, density: f64) -> bool {
        let (n, m) = self.matrix();
        let threshold = m[(y as usize % n) * n + x as usize % n] as f64;
        threshold < density * (n * n) as f64
    }
}

impl fmt::Display for DitherPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DitherPattern {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        DitherPattern::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                EngineError::validation("pattern", format!("unknown dither pattern {:?}", s))
            })
    }
}

/// Tile `pattern` over `rect`, painting `color2` where the matrix threshold
/// falls below `density × n²` and `color1` elsewhere.
///
/// The matrix is anchored at the raster origin so adjacent fills line up.
/// `rect` is clipped to the raster. Returns the number of pixels painted.
pub fn fill_pattern(
    raster: &mut Raster,
    rect: Rect,
    color1: RGBA8,
    color2: RGBA8,
    pattern: DitherPattern,
    density: f64,
) -> Result<usize> {
    if !(0.0..=1.0).contains(&density) {
        return Err(EngineError::validation(
            "density",
            format!("must be in [0, 1], got {}", density),
        ));
    }

    let x_end = rect.x.saturating_add(rect.width).min(raster.width);
    let y_end = rect.y.saturating_add(rect.height).min(raster.height);
    let mut painted = 0;

    for y in rect.y..y_end {
        for x in rect.x..x_end {
            let color = if pattern.selects_second(x, y, density) {
                color2
            } else {
                color1
            };
            raster.set(x, y, color);
            painted += 1;
        }
    }

    Ok(painted)
}
