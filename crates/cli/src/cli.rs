//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Feed - periodic sampling of sensors into pluggable sinks
#[derive(Parser, Debug)]
#[command(
    name = "sensor-feed",
    author,
    version,
    about = "Periodic sensor sampling and dispatch",
    long_about = "Samples a set of sensors on a fixed period, drains their readings into \n\
                  the configured sinks and optionally drives a threshold-triggered \n\
                  plant controller."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_FEED_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "SENSOR_FEED_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the feed until interrupted
    Run(RunArgs),

    /// Validate a configuration file without starting anything
    Validate(ValidateArgs),

    /// Display the resolved sensors, sinks and plant controller
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "SENSOR_FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the sensor sampling period (seconds)
    #[arg(long, env = "SENSOR_FEED_SENSOR_PERIOD")]
    pub sensor_period: Option<f64>,

    /// Override the wait between dispatch iterations (seconds)
    #[arg(long, env = "SENSOR_FEED_POLL_WAIT")]
    pub poll_wait: Option<f64>,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSOR_FEED_METRICS_PORT")]
    pub metrics_port: u16,

    /// Resolve the configuration, print the plan and exit
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Exporter port, `None` when disabled
    pub fn metrics_port(&self) -> Option<u16> {
        (self.metrics_port != 0).then_some(self.metrics_port)
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, env = "SENSOR_FEED_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if omitted
    #[arg(short, long, env = "SENSOR_FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
