//! # Sensor Feed CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Feed lifecycle (start, dispatch, graceful shutdown)
//! - A printable view of the resolved components

mod cli;
mod commands;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_feed, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_observability(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "sensor feed starting");

    let result = match &cli.command {
        Commands::Run(args) => run_feed(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "command failed");
    }
    result.context("sensor-feed failed")
}

/// Tracing for every command, the exporter only for `run`
fn init_observability(cli: &Cli) -> Result<()> {
    let metrics_port = match &cli.command {
        Commands::Run(args) => args.metrics_port(),
        _ => None,
    };
    let config = ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        ..Default::default()
    }
    .with_verbosity(cli.verbose, cli.quiet);

    observability::init_with_config(config).context("Failed to initialize logging")
}
