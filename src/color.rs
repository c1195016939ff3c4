//! Color space conversions: hex, CIE LAB (D65) and HSL.
//!
//! LAB is used for every perceptual distance and centroid average in the
//! engine; HSL drives palette metadata and shading ramps.

use crate::error::{EngineError, Result};
use rgb::RGBA8;
use serde::Serialize;

/// CIE L*a*b* color. `l` is in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.l, self.a, self.b]
    }

    #[inline]
    pub fn from_array(v: [f64; 3]) -> Self {
        Lab {
            l: v[0],
            a: v[1],
            b: v[2],
        }
    }

    #[inline]
    pub fn distance_sq(&self, other: &Lab) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl * dl + da * da + db * db
    }
}

/// Hue in degrees [0, 360), saturation and lightness in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

// D65 reference white
const XN: f64 = 0.95047;
const YN: f64 = 1.0;
const ZN: f64 = 1.08883;
const DELTA: f64 = 6.0 / 29.0;

/// Parse `#RRGGBB` or `#RRGGBBAA` (the `#` is optional). Missing alpha is 255.
pub fn parse_hex(hex: &str) -> Result<RGBA8> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 && digits.len() != 8 {
        return Err(EngineError::validation(
            "hex color",
            format!("expected #RRGGBB or #RRGGBBAA, got {:?}", hex),
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::validation(
            "hex color",
            format!("non-hex characters in {:?}", hex),
        ));
    }

    let channel = |i: usize| -> Result<u8> {
        u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| {
            EngineError::validation("hex color", format!("{:?}: {}", hex, e))
        })
    };

    let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
    Ok(RGBA8::new(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// `#RRGGBB`, upper-case.
pub fn to_hex_rgb(c: &RGBA8) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}

/// `#RRGGBBAA`, upper-case.
pub fn to_hex_rgba(c: &RGBA8) -> String {
    format!("#{:02X}{:02X}{:02X}{:02X}", c.r, c.g, c.b, c.a)
}

#[inline]
fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f64) -> u8 {
    let c = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

#[inline]
fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// sRGB → LAB. Alpha is ignored.
pub fn rgb_to_lab(c: &RGBA8) -> Lab {
    let r = srgb_to_linear(c.r);
    let g = srgb_to_linear(c.g);
    let b = srgb_to_linear(c.b);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// LAB → opaque sRGB, clamped into gamut.
pub fn lab_to_rgb(lab: &Lab) -> RGBA8 {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let x = XN * lab_f_inv(fx);
    let y = YN * lab_f_inv(fy);
    let z = ZN * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    RGBA8::new(linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b), 255)
}

pub fn rgb_to_hsl(c: &RGBA8) -> Hsl {
    let r = c.r as f64 / 255.0;
    let g = c.g as f64 / 255.0;
    let b = c.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    Hsl {
        h: (h * 60.0).rem_euclid(360.0),
        s,
        l,
    }
}

/// HSL → sRGB with the given alpha.
pub fn hsl_to_rgb(hsl: &Hsl, alpha: u8) -> RGBA8 {
    let h = hsl.h.rem_euclid(360.0);
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    RGBA8::new(to_u8(r1), to_u8(g1), to_u8(b1), alpha)
}

/// Nearest-color lookup against a fixed palette, by LAB distance.
///
/// Fully transparent palette entries never match.
#[derive(Debug, Clone)]
pub struct PaletteMatcher {
    entries: Vec<(usize, Lab)>,
}

impl PaletteMatcher {
    pub fn new(palette: &[RGBA8]) -> Result<Self> {
        let entries: Vec<(usize, Lab)> = palette
            .iter()
            .enumerate()
            .filter(|(_, c)| c.a > 0)
            .map(|(i, c)| (i, rgb_to_lab(c)))
            .collect();

        if entries.is_empty() {
            return Err(EngineError::Lookup(format!(
                "palette has no opaque colors ({} entries)",
                palette.len()
            )));
        }
        Ok(Self { entries })
    }

    /// Index into the original palette of the closest entry.
    #[inline]
    pub fn nearest(&self, lab: &Lab) -> usize {
        let mut best_idx = self.entries[0].0;
        let mut best_dist = f64::MAX;
        for (idx, entry) in &self.entries {
            let d = entry.distance_sq(lab);
            if d < best_dist {
                best_dist = d;
                best_idx = *idx;
            }
        }
        best_idx
    }
}

/// Find the LAB-nearest palette index for one color.
pub fn nearest_palette_index(color: &RGBA8, palette: &[RGBA8]) -> Result<usize> {
    let matcher = PaletteMatcher::new(palette)?;
    Ok(matcher.nearest(&rgb_to_lab(color)))
}
