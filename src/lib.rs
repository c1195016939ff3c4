//! colorcomp - color and composition analysis for pixel art
//!
//! This library works on in-memory RGBA rasters and answers color and
//! structure questions about them.
//!
//! ## Features
//!
//! - **Palette extraction** with k-means clustering in CIE LAB
//! - **Color quantization** using median cut, k-means or an octree
//! - **Dithering** with nearest-color or Floyd-Steinberg error diffusion, and
//!   ordered pattern fills
//! - **Auto-shading** of flat regions under a synthetic light
//! - **Structure analysis**: brightness maps, Sobel edges and rule-of-thirds
//!   composition
//!
//! ## Example
//!
//! ```rust,no_run
//! use colorcomp::{extract_palette, Raster};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let img = image::open("sprite.png").unwrap().to_rgba8();
//! let raster = Raster::from_rgba_image(&img);
//! let mut rng = StdRng::seed_from_u64(7);
//! for entry in extract_palette(&raster, 8, &mut rng).unwrap() {
//!     println!("{} {}", entry.hex, entry.role);
//! }
//! ```
//!
//! The library never installs a `tracing` subscriber; its debug events are
//! only visible when the embedding program sets one up.

pub mod analyzer;
pub mod color;
pub mod ditherer;
pub mod edge_detector;
pub mod error;
pub mod kmeans;
pub mod octree;
pub mod palette_extractor;
pub mod quantizer;
pub mod raster;
pub mod region_extractor;
pub mod sampler;
pub mod shading;

pub use analyzer::{analyze_composition, brightness_map, BrightnessMap, Composition};
pub use color::{nearest_palette_index, parse_hex, rgb_to_hsl, rgb_to_lab, to_hex_rgb, Hsl, Lab};
pub use ditherer::{fill_pattern, remap, DitherPattern};
pub use edge_detector::{detect_edges, EdgeMap, MajorEdge};
pub use error::{EngineError, Result};
pub use palette_extractor::{extract_palette, PaletteColor, ShadeRole};
pub use quantizer::{quantize, QuantizeAlgorithm, QuantizeOptions, QuantizeResult};
pub use raster::{Raster, Rect};
pub use rgb::RGBA8;
pub use sampler::sample;
pub use shading::{shade, LightDirection, ShadingOptions, ShadingResult, ShadingStyle};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_options_defaults() {
        let q = QuantizeOptions::default();
        assert_eq!(q.target_colors, 16);
        assert_eq!(q.algorithm, QuantizeAlgorithm::MedianCut);
        assert!(q.preserve_transparency);
        assert_eq!(q.max_samples, sampler::DEFAULT_MAX_SAMPLES);

        let s = ShadingOptions::default();
        assert_eq!(s.light_direction, LightDirection::TopLeft);
        assert_eq!(s.intensity, 0.5);
        assert_eq!(s.style, ShadingStyle::Cell);
        assert!(s.hue_shift);
    }

    #[test]
    fn test_quantize_then_remap_uses_only_palette_colors() {
        let mut raster = Raster::filled(8, 8, RGBA8::new(200, 30, 30, 255));
        for y in 0..8 {
            for x in 4..8 {
                raster.set(x, y, RGBA8::new(20, 40, 220, 255));
            }
        }
        raster.set(0, 0, RGBA8::new(190, 35, 28, 255));

        let mut rng = StdRng::seed_from_u64(3);
        let options = QuantizeOptions {
            target_colors: 2,
            ..Default::default()
        };
        let result = quantize(&raster, &options, &mut rng).unwrap();
        assert_eq!(result.palette.len(), 2);
        assert_eq!(result.original_color_count, 3);

        let out = remap(&raster, &result.palette, false).unwrap();
        assert!(out.pixels.iter().all(|p| result.palette.contains(p)));
    }
}
