//! In-memory RGBA raster shared by every component.

use crate::error::{EngineError, Result};
use rgb::RGBA8;
use serde::Serialize;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Width × height grid of RGBA samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGBA8>,
}

impl Raster {
    /// Wrap a pixel buffer, checking that it matches the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<RGBA8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(EngineError::validation(
                "pixels",
                format!(
                    "buffer holds {} pixels but {}x{} needs {}",
                    pixels.len(),
                    width,
                    height,
                    expected
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A raster filled with one color.
    pub fn filled(width: u32, height: u32, color: RGBA8) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> RGBA8 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: RGBA8) {
        let idx = self.index(x, y);
        self.pixels[idx] = color;
    }

    pub fn from_rgba_image(img: &image::RgbaImage) -> Self {
        let pixels: Vec<RGBA8> = img
            .pixels()
            .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
            .collect();

        Self {
            width: img.width(),
            height: img.height(),
            pixels,
        }
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.pixels.iter()) {
            *dst = image::Rgba([src.r, src.g, src.b, src.a]);
        }
        out
    }

    /// Bilinear resample to `target_width` × `target_height`.
    ///
    /// Sample positions use pixel-centre mapping, so a same-size resample
    /// returns the input unchanged.
    pub fn resize_bilinear(&self, target_width: u32, target_height: u32) -> Result<Raster> {
        if target_width == 0 || target_height == 0 {
            return Err(EngineError::validation(
                "target size",
                format!("must be positive, got {}x{}", target_width, target_height),
            ));
        }
        if self.is_empty() {
            return Err(EngineError::degenerate("cannot resample a zero-area raster"));
        }
        if target_width == self.width && target_height == self.height {
            return Ok(self.clone());
        }

        let scale_x = self.width as f64 / target_width as f64;
        let scale_y = self.height as f64 / target_height as f64;

        let mut pixels = Vec::with_capacity(target_width as usize * target_height as usize);
        for dst_y in 0..target_height {
            let src_y = src_coord(dst_y, self.height, scale_y);
            let y0 = src_y.floor() as u32;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = src_y - y0 as f64;

            for dst_x in 0..target_width {
                let src_x = src_coord(dst_x, self.width, scale_x);
                let x0 = src_x.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = src_x - x0 as f64;

                // Sample four corners
                let p00 = self.get(x0, y0);
                let p10 = self.get(x1, y0);
                let p01 = self.get(x0, y1);
                let p11 = self.get(x1, y1);

                let top = lerp(&p00, &p10, fx);
                let bottom = lerp(&p01, &p11, fx);
                let [r, g, b, a] = lerp_f64(&top, &bottom, fy).map(to_channel);
                pixels.push(RGBA8::new(r, g, b, a));
            }
        }

        Ok(Raster {
            width: target_width,
            height: target_height,
            pixels,
        })
    }
}

/// Source coordinate of destination index `dst_i`, pixel-centre mapped and
/// clamped to the source extent.
#[inline]
fn src_coord(dst_i: u32, src_len: u32, scale: f64) -> f64 {
    let max = (src_len - 1) as f64;
    ((dst_i as f64 + 0.5) * scale - 0.5).clamp(0.0, max)
}

#[inline]
fn lerp(a: &RGBA8, b: &RGBA8, t: f64) -> [f64; 4] {
    let a = [a.r as f64, a.g as f64, a.b as f64, a.a as f64];
    let b = [b.r as f64, b.g as f64, b.b as f64, b.a as f64];
    lerp_f64(&a, &b, t)
}

#[inline]
fn lerp_f64(a: &[f64; 4], b: &[f64; 4], t: f64) -> [f64; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[inline]
fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
