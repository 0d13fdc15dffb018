// starpad - A star drawing pad for Wayland
// Drag to draw four-pointed stars on a layer-shell canvas; right-click for the menu

mod app;
mod cli;
mod color;
mod history;
mod menu;
mod raster;
mod star;
mod surface;
mod wayland;
mod wgpu_renderer;

use anyhow::Result;
use log::info;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let config = cli::parse_args()?;

    info!(
        "Starting starpad with colors {} / {}, background {}",
        config.palette.border_a, config.palette.border_b, config.background
    );
    info!(
        "Requested canvas: {}x{}, opacity: {}",
        config.width, config.height, config.opacity
    );

    // Run with layer-shell (GPU rendering by default, CPU as fallback)
    info!("Using layer-shell mode (GPU: {})", config.use_gpu);
    wayland::run(config)
}
