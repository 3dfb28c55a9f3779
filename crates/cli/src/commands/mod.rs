//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_feed;
pub use validate::run_validate;

use std::path::Path;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{FeedBlueprint, ThresholdDirection};
use factory::ResolvedFeed;
use serde::Serialize;
use tracing::info;

use crate::error::{CliError, Result};

/// Load `path`, or the built-in defaults when no path is given
fn load_blueprint(path: Option<&Path>) -> Result<FeedBlueprint> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
        info!(config = %path.display(), "loading configuration");
    }
    Ok(ConfigLoader::load_or_default(path)?)
}

/// Resolved feed as shown by `info` and `run --dry-run`
#[derive(Debug, Serialize)]
struct FeedPlan {
    sensor_period_secs: f64,
    poll_wait_secs: f64,
    sensors: Vec<SensorPlan>,
    sinks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plant_control: Option<PlantPlan>,
}

#[derive(Debug, Serialize)]
struct SensorPlan {
    name: String,
    id: String,
    unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_period_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_period_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PlantPlan {
    trigger_param: String,
    threshold: String,
    action_duration_secs: f64,
    min_period_secs: f64,
    param_name: String,
}

impl FeedPlan {
    fn from_resolved(resolved: &ResolvedFeed) -> Self {
        let sensors = resolved
            .sensors
            .iter()
            .map(|sensor| {
                let d = sensor.descriptor();
                SensorPlan {
                    name: d.name.clone(),
                    id: d.id.to_string(),
                    unit: d.unit.clone(),
                    min_period_secs: d.bounds.min().map(|p| p.as_secs_f64()),
                    max_period_secs: d.bounds.max().map(|p| p.as_secs_f64()),
                }
            })
            .collect();

        let plant_control = resolved.plant.as_ref().map(|plant| {
            let s = plant.settings();
            let side = match s.threshold.direction {
                ThresholdDirection::Above => ">",
                ThresholdDirection::Below => "<",
            };
            PlantPlan {
                trigger_param: s.trigger_param.clone(),
                threshold: format!("{side} {}", s.threshold.level),
                action_duration_secs: s.action_duration.as_secs_f64(),
                min_period_secs: s.min_period.as_secs_f64(),
                param_name: s.param_name.clone(),
            }
        });

        Self {
            sensor_period_secs: resolved.sensor_period.as_secs_f64(),
            poll_wait_secs: resolved.poll_wait.as_secs_f64(),
            sensors,
            sinks: resolved.sink_names(),
            plant_control,
        }
    }

    fn print(&self) {
        println!("\n=== Feed Plan ===\n");
        println!("Sensor period: {:?}", Duration::from_secs_f64(self.sensor_period_secs));
        println!("Poll wait: {:?}", Duration::from_secs_f64(self.poll_wait_secs));

        println!("\nSensors ({}):", self.sensors.len());
        for sensor in &self.sensors {
            let bounds = match (sensor.min_period_secs, sensor.max_period_secs) {
                (None, None) => String::new(),
                (min, max) => format!(
                    " period [{}, {}]",
                    min.map_or("-".to_string(), |s| format!("{s}s")),
                    max.map_or("-".to_string(), |s| format!("{s}s"))
                ),
            };
            println!("  - {} (id {}, unit {}){bounds}", sensor.name, sensor.id, sensor.unit);
        }

        println!("\nSinks ({}):", self.sinks.len());
        for sink in &self.sinks {
            println!("  - {sink}");
        }

        if let Some(plant) = &self.plant_control {
            println!("\nPlant control:");
            println!("  Trigger: {} {}", plant.trigger_param, plant.threshold);
            println!("  Action duration: {}s", plant.action_duration_secs);
            println!("  Reports '{}' every >= {}s", plant.param_name, plant.min_period_secs);
        }
        println!();
    }
}
