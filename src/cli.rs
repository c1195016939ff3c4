use clap::{Parser, Subcommand};
use colorcomp::{DitherPattern, LightDirection, QuantizeAlgorithm, Rect, ShadingStyle, RGBA8};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "colorcomp")]
#[command(about = "Color and composition analysis for pixel art")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract a sorted, role-tagged palette
    Palette {
        /// Input image files
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Number of palette colors (2-256)
        #[arg(short, long, default_value = "8")]
        k: usize,

        /// Seed for k-means initialisation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Reduce an image to a limited palette, optionally writing the remapped image
    Quantize {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,

        /// Target palette size (2-256)
        #[arg(short, long, default_value = "16")]
        colors: usize,

        /// median_cut, kmeans or octree
        #[arg(short, long, default_value = "median_cut")]
        algorithm: QuantizeAlgorithm,

        /// Keep fully transparent pixels out of the palette
        #[arg(long)]
        preserve_transparency: bool,

        /// Write the image remapped onto the palette
        #[arg(long)]
        remap: Option<PathBuf>,

        /// Use Floyd-Steinberg error diffusion when remapping
        #[arg(long, requires = "remap")]
        dither: bool,

        /// Seed for k-means initialisation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Auto-shade flat regions under a synthetic light
    Shade {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Light direction, e.g. top_left
        #[arg(short = 'd', long, default_value = "top_left")]
        direction: LightDirection,

        /// Shading strength (0.0-1.0)
        #[arg(long, default_value = "0.5")]
        intensity: f64,

        /// cell, smooth or soft
        #[arg(long, default_value = "cell")]
        style: ShadingStyle,

        /// Cool shadows and warm highlights
        #[arg(long)]
        hue_shift: bool,
    },

    /// Quantized brightness map for value studies
    Brightness {
        /// Input image files
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Map width
        #[arg(short = 'W', long, default_value = "32")]
        width: u32,

        /// Map height
        #[arg(short = 'H', long, default_value = "32")]
        height: u32,

        /// Number of brightness levels (2-256)
        #[arg(short, long, default_value = "5")]
        levels: u16,
    },

    /// Sobel edge map and major edges
    Edges {
        /// Input image files
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Gradient threshold (0-255)
        #[arg(short, long, default_value = "50")]
        threshold: f64,

        /// Downsample width before detection
        #[arg(short = 'W', long, requires = "height")]
        width: Option<u32>,

        /// Downsample height before detection
        #[arg(short = 'H', long, requires = "width")]
        height: Option<u32>,
    },

    /// Rule-of-thirds composition analysis
    Composition {
        /// Input image files
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Gradient threshold (0-255)
        #[arg(short, long, default_value = "50")]
        threshold: f64,
    },

    /// Fill a rectangle with a two-color ordered pattern
    Pattern {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Rectangle as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        rect: Rect,

        /// Background color (#RRGGBB or #RRGGBBAA)
        #[arg(long, value_parser = parse_color)]
        color1: RGBA8,

        /// Pattern color (#RRGGBB or #RRGGBBAA)
        #[arg(long, value_parser = parse_color)]
        color2: RGBA8,

        /// bayer_2x2, bayer_4x4, bayer_8x8, checkerboard, horizontal_lines,
        /// vertical_lines or diagonal
        #[arg(short, long, default_value = "bayer_4x4")]
        pattern: DitherPattern,

        /// Share of pixels painted with color2 (0.0-1.0)
        #[arg(long, default_value = "0.5")]
        density: f64,
    },
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle {:?}: {}", s, e))?;
    match parts[..] {
        [x, y, width, height] => Ok(Rect { x, y, width, height }),
        _ => Err(format!("expected x,y,width,height, got {:?}", s)),
    }
}

fn parse_color(s: &str) -> Result<RGBA8, String> {
    colorcomp::parse_hex(s).map_err(|e| e.to_string())
}
