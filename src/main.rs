// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use panorama::config::CaptureConfig;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "panorama")]
#[command(about = "Panorama capture pipeline, run against simulated hardware")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulated capture: viewfinder, sweep, review, save
    Capture {
        /// Horizontal sweep in degrees before capture auto-stops
        #[arg(short, long)]
        sweep_angle: Option<i32>,

        /// Output directory (default: ~/Pictures/panorama)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after the review mosaic instead of saving
        #[arg(long)]
        skip_save: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=panorama=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Cli::parse();
    let mut config = CaptureConfig::load();

    match args.command {
        Some(Commands::Config) => {
            cli::show_config(&config);
            Ok(())
        }
        Some(Commands::Capture {
            sweep_angle,
            output,
            skip_save,
        }) => {
            if let Some(sweep) = sweep_angle {
                config.sweep_angle = sweep;
            }
            if output.is_some() {
                config.save_dir = output;
            }
            cli::run_capture(config, skip_save).await
        }
        None => cli::run_capture(config, false).await,
    }
}
