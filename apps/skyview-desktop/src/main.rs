mod app;
mod frame;

use anyhow::{Context, Result};
use clap::Parser;
use skyview_render::ViewerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "skyview-desktop", about = "Free-fly viewer for the landmark scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Viewer config (YAML). Defaults to ./skyview.yaml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Asset root holding objects/ and textures/
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Target frame rate; 0 disables the cap
    #[arg(long)]
    fps: Option<u32>,
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let cwd = std::env::current_dir().context("reading working directory")?;
    let mut config =
        ViewerConfig::resolve(cli.config.as_deref(), &cwd).context("loading viewer config")?;
    if let Some(assets) = &cli.assets {
        config.asset_root = assets.clone();
    }
    if let Some(fps) = cli.fps {
        config.target_fps = fps;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("skyview-desktop starting");

    let config = load_config(&cli)?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = app::ViewerApp::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.take_error() {
        tracing::error!("{err:#}");
        return Err(err);
    }
    tracing::info!("skyview-desktop exited cleanly");
    Ok(())
}
