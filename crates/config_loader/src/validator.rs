//! Config validation
//!
//! Rules:
//! - sensor_period_secs and poll_wait_secs are positive durations the
//!   monotonic clock can schedule
//! - every sensor and sink has a kind
//! - sink names (explicit name, else kind) are unique
//! - plant control: non-empty trigger, finite threshold, positive durations
//!
//! Unknown kinds are left to the component registry.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use contracts::{ComponentSpec, ContractError, FeedBlueprint, PlantControlConfig};

/// Validate a FeedBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    validate_feed(blueprint)?;
    validate_kinds("sensors", &blueprint.sensors)?;
    validate_kinds("sinks", &blueprint.sinks)?;
    validate_sink_names(blueprint)?;
    if let Some(plant) = &blueprint.plant_control {
        validate_plant_control(plant)?;
    }
    Ok(())
}

fn positive_secs(field: &str, secs: f64) -> Result<(), ContractError> {
    let duration = match Duration::try_from_secs_f64(secs) {
        Ok(duration) if secs > 0.0 => duration,
        _ => {
            return Err(ContractError::config_validation(
                field,
                format!("must be a positive number of seconds, got {secs}"),
            ))
        }
    };
    if Instant::now().checked_add(duration).is_none() {
        return Err(ContractError::config_validation(
            field,
            format!("{secs} seconds is too long to schedule"),
        ));
    }
    Ok(())
}

fn validate_feed(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    positive_secs("feed.sensor_period_secs", blueprint.feed.sensor_period_secs)?;
    positive_secs("feed.poll_wait_secs", blueprint.feed.poll_wait_secs)
}

fn validate_kinds(section: &str, specs: &[ComponentSpec]) -> Result<(), ContractError> {
    for (idx, spec) in specs.iter().enumerate() {
        if spec.kind.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("{section}[{idx}].kind"),
                "kind cannot be empty",
            ));
        }
    }
    Ok(())
}

/// Sink names must be unique; an unnamed sink goes by its kind
fn validate_sink_names(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        let name = sink.name.as_deref().unwrap_or(&sink.kind);
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(name) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{name}'"),
            ));
        }
    }
    Ok(())
}

fn validate_plant_control(plant: &PlantControlConfig) -> Result<(), ContractError> {
    if plant.trigger_param.trim().is_empty() {
        return Err(ContractError::config_validation(
            "plant_control.trigger_param",
            "trigger parameter cannot be empty",
        ));
    }
    if !plant.threshold.is_finite() {
        return Err(ContractError::config_validation(
            "plant_control.threshold",
            format!("threshold must be finite, got {}", plant.threshold),
        ));
    }
    positive_secs("plant_control.action_duration_secs", plant.action_duration_secs)?;
    if let Some(min_period) = plant.min_period_secs {
        positive_secs("plant_control.min_period_secs", min_period)?;
    }
    if plant.param_name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "plant_control.param_name",
            "parameter name cannot be empty",
        ));
    }
    Ok(())
}
