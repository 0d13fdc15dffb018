// Command line interface module
// Handles parsing of command line arguments into the editor configuration

use crate::app::Palette;
use crate::color::Rgb;
use anyhow::{bail, Result};
use clap::Parser;

/// starpad - Drag to draw four-pointed stars on a Wayland overlay
#[derive(Parser, Debug)]
#[command(name = "starpad")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Border color of the first and third arm (#RRGGBB or #RGB)
    #[arg(long = "color1", default_value = "#0000ff")]
    pub color1: Rgb,

    /// Border color of the second and fourth arm (#RRGGBB or #RGB)
    #[arg(long = "color2", default_value = "#ff0000")]
    pub color2: Rgb,

    /// Canvas background color
    #[arg(short, long, default_value = "#ffffff")]
    pub background: Rgb,

    /// Canvas width in pixels
    #[arg(short = 'W', long, default_value = "800")]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(short = 'H', long, default_value = "600")]
    pub height: u32,

    /// Opacity of the window (0.0 - 1.0)
    #[arg(short, long, default_value = "1.0", value_parser = parse_opacity)]
    pub opacity: f32,

    /// Disable GPU rendering and use CPU rendering only
    #[arg(long, default_value = "false")]
    pub cpu: bool,
}

/// Validated settings the application starts with
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub palette: Palette,
    pub background: Rgb,
    pub width: u32,
    pub height: u32,
    pub opacity: f32,
    /// Use GPU rendering (default true, set to false with --cpu)
    pub use_gpu: bool,
}

/// Smallest canvas that still fits the context menu
pub const MIN_CANVAS: u32 = 200;

/// Parse opacity value and ensure it's within valid range
fn parse_opacity(s: &str) -> Result<f32, String> {
    let opacity: f32 = s.parse().map_err(|_| "Invalid opacity value")?;
    if !(0.0..=1.0).contains(&opacity) {
        return Err("Opacity must be between 0.0 and 1.0".to_string());
    }
    Ok(opacity)
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        if args.width < MIN_CANVAS || args.height < MIN_CANVAS {
            bail!(
                "Canvas must be at least {}x{} pixels, got {}x{}",
                MIN_CANVAS,
                MIN_CANVAS,
                args.width,
                args.height
            );
        }

        Ok(Config {
            palette: Palette {
                border_a: args.color1,
                border_b: args.color2,
            },
            background: args.background,
            width: args.width,
            height: args.height,
            opacity: args.opacity,
            use_gpu: !args.cpu, // GPU is default, --cpu disables it
        })
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<Config> {
    Config::try_from(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Config> {
        let args = Args::try_parse_from(std::iter::once("starpad").chain(argv.iter().copied()))?;
        Config::try_from(args)
    }

    #[test]
    fn defaults_match_the_classic_palette() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.palette, Palette::default());
        assert_eq!(config.background, Rgb::WHITE);
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.opacity, 1.0);
        assert!(config.use_gpu);
    }

    #[test]
    fn colors_and_flags_are_applied() {
        let config = parse(&[
            "--color1", "#0f0", "--color2", "123456", "--cpu", "-o", "0.5",
        ])
        .unwrap();
        assert_eq!(config.palette.border_a, Rgb(0, 255, 0));
        assert_eq!(config.palette.border_b, Rgb(0x12, 0x34, 0x56));
        assert!(!config.use_gpu);
        assert_eq!(config.opacity, 0.5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--color1", "nope"]).is_err());
        assert!(parse(&["--opacity", "1.5"]).is_err());
        assert!(parse(&["--width", "50"]).is_err());
    }
}
