//! bebop - a minimal master-stack tiling window manager for X11.
//!
//! The first client takes the left half of the screen, every other client
//! shares the right half in equal horizontal slices. A single window fills
//! the whole screen.

mod config;
mod display;
mod focus;
mod launcher;
mod layout;
mod registry;
mod state;
mod tracing;
mod types;
mod wm;
mod x11;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::Config;
use launcher::ShellLauncher;
use wm::Wm;
use x11::X11Display;

/// bebop - master-stack tiling window manager
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/bebop/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Maximum number of managed windows, overriding the config file
    #[arg(long)]
    capacity: Option<usize>,

    /// Do not launch the autostart commands
    #[arg(long)]
    no_autostart: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();

    log::info!("Starting bebop - master-stack tiling window manager");

    let mut config = match cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    if let Some(capacity) = cli.capacity {
        config.general.capacity = capacity;
    }
    if cli.no_autostart {
        config.general.autostart.clear();
    }

    let display = X11Display::connect()?;
    let launcher = ShellLauncher::new(config.general.reap_children);
    let mut wm = Wm::new(display, launcher, &config);

    // Become the window manager, grab keys, adopt existing windows
    wm.setup()?;

    wm.autostart();

    // Run the event loop
    wm.run()?;

    Ok(())
}
