//! Bounded pixel sampling for the expensive clustering paths.

use crate::error::{EngineError, Result};
use crate::raster::Raster;
use rgb::RGBA8;
use tracing::debug;

/// Sample cap used by palette extraction and quantization.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// Draw at most `max_samples` pixels from `raster`, spread over the whole grid.
///
/// Small rasters are returned whole in row-major order. Larger ones are
/// strided by `floor(sqrt(total / max_samples))` in both axes; if that stride
/// still overshoots the cap (very thin rasters), the strided set is thinned
/// once more with an even 1-D step.
pub fn sample(raster: &Raster, max_samples: usize) -> Result<Vec<RGBA8>> {
    if raster.is_empty() {
        return Err(EngineError::degenerate("cannot sample a zero-area raster"));
    }
    if max_samples == 0 {
        return Err(EngineError::validation("max_samples", "must be positive"));
    }

    let total = raster.pixel_count();
    if total <= max_samples {
        return Ok(raster.pixels.clone());
    }

    let stride = ((total as f64 / max_samples as f64).sqrt().floor() as usize).max(1);
    let mut samples = Vec::with_capacity(max_samples + 1);
    for y in (0..raster.height as usize).step_by(stride) {
        let row = y * raster.width as usize;
        for x in (0..raster.width as usize).step_by(stride) {
            samples.push(raster.pixels[row + x]);
        }
    }

    if samples.len() > max_samples {
        let step = samples.len().div_ceil(max_samples);
        samples = samples.into_iter().step_by(step).collect();
    }

    debug!(total, stride, sampled = samples.len(), "sampled raster");
    Ok(samples)
}
