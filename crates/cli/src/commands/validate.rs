//! `validate` command implementation.

use contracts::FeedBlueprint;
use factory::{ComponentRegistry, ResolveOptions};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sensor_count: usize,
    sink_count: usize,
    plant_control: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "validating configuration");

    let result = validate_config(args);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::Invalid {
            path: result.config_path,
        })
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    let checked = load_blueprint(Some(&args.config)).and_then(|blueprint| {
        // Resolving catches unknown kinds and bad params; nothing is started
        let options = ResolveOptions {
            simulate_outputs: true,
        };
        let resolved = ComponentRegistry::with_builtins().resolve_with(&blueprint, options)?;
        Ok((blueprint, resolved.sensors.len()))
    });

    match checked {
        Ok((blueprint, sensor_count)) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                sensor_count,
                sink_count: blueprint.sinks.len(),
                plant_control: blueprint.plant_control.is_some(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(blueprint: &FeedBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - readings will be drained and dropped".to_string());
    }
    if blueprint.sensors.is_empty() && blueprint.plant_control.is_none() {
        warnings.push("No sensors configured - the feed will idle".to_string());
    }
    if blueprint.feed.poll_wait() > blueprint.feed.sensor_period() * 10 {
        warnings.push(
            "poll_wait is much longer than sensor_period - readings will queue up".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Plant control: {}", if summary.plant_control { "yes" } else { "no" });
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
