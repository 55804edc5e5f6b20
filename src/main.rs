//! trellis command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use trellis::cli::{self, Cli, Commands};
use trellis::config::TrellisConfig;
use trellis::core;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = TrellisConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(&config),
        Commands::Route { paths } => cli::route::run_route(paths, &config),
    }
}
