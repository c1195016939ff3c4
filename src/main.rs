mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use colorcomp::{
    analyze_composition, brightness_map, detect_edges, extract_palette, fill_pattern, quantize,
    remap, shade, to_hex_rgb, QuantizeOptions, Raster, ShadingOptions,
};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn load_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgba8();
    Ok(Raster::from_rgba_image(&img))
}

fn save_raster(raster: &Raster, path: &Path) -> Result<()> {
    raster
        .to_rgba_image()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Run `analyze` over every input in parallel, keeping input order.
fn for_each_input<T, F>(inputs: &[PathBuf], analyze: F) -> Result<Vec<serde_json::Value>>
where
    T: Serialize,
    F: Fn(&Raster) -> Result<T> + Sync,
{
    inputs
        .par_iter()
        .map(|path| -> Result<serde_json::Value> {
            let raster = load_raster(path)?;
            let result = analyze(&raster)
                .with_context(|| format!("while analyzing {}", path.display()))?;
            Ok(json!({
                "input": path.display().to_string(),
                "result": serde_json::to_value(result)?,
            }))
        })
        .collect()
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Palette { input, k, seed } => {
            info!(inputs = input.len(), k, "extracting palettes");
            let reports = for_each_input(&input, |raster| {
                let mut rng = make_rng(seed);
                Ok(extract_palette(raster, k, &mut rng)?)
            })?;
            print_json(&reports)?;
        }

        Command::Quantize {
            input,
            colors,
            algorithm,
            preserve_transparency,
            remap: remap_output,
            dither,
            seed,
        } => {
            let raster = load_raster(&input)?;
            let options = QuantizeOptions {
                target_colors: colors,
                algorithm,
                preserve_transparency,
                ..Default::default()
            };
            info!(%algorithm, colors, "quantizing {}", input.display());
            let mut rng = make_rng(seed);
            let result = quantize(&raster, &options, &mut rng)?;

            if let Some(output) = &remap_output {
                let remapped = remap(&raster, &result.palette, dither)?;
                save_raster(&remapped, output)?;
                info!("wrote {}", output.display());
            }

            let hex: Vec<String> = result.palette.iter().map(to_hex_rgb).collect();
            print_json(&json!({
                "palette": hex,
                "original_color_count": result.original_color_count,
            }))?;
        }

        Command::Shade {
            input,
            output,
            direction,
            intensity,
            style,
            hue_shift,
        } => {
            let raster = load_raster(&input)?;
            let options = ShadingOptions {
                light_direction: direction,
                intensity,
                style,
                hue_shift,
                ..Default::default()
            };
            let result = shade(&raster, &options)?;
            save_raster(&result.raster, &output)?;
            info!(regions = result.regions_shaded, "wrote {}", output.display());
            print_json(&json!({
                "regions_shaded": result.regions_shaded,
                "generated_colors": result.generated_colors,
            }))?;
        }

        Command::Brightness {
            input,
            width,
            height,
            levels,
        } => {
            let reports = for_each_input(&input, |raster| {
                Ok(brightness_map(raster, width, height, levels)?)
            })?;
            print_json(&reports)?;
        }

        Command::Edges {
            input,
            threshold,
            width,
            height,
        } => {
            let target = width.zip(height);
            let reports = for_each_input(&input, |raster| {
                Ok(detect_edges(raster, threshold, target)?)
            })?;
            print_json(&reports)?;
        }

        Command::Composition { input, threshold } => {
            let reports = for_each_input(&input, |raster| {
                Ok(analyze_composition(raster, threshold)?)
            })?;
            print_json(&reports)?;
        }

        Command::Pattern {
            input,
            output,
            rect,
            color1,
            color2,
            pattern,
            density,
        } => {
            let mut raster = load_raster(&input)?;
            let painted = fill_pattern(&mut raster, rect, color1, color2, pattern, density)?;
            save_raster(&raster, &output)?;
            info!(painted, %pattern, "wrote {}", output.display());
            print_json(&json!({ "pixels_painted": painted }))?;
        }
    }

    Ok(())
}
