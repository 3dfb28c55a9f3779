//! FeedBlueprint - Config Loader output
//!
//! Declarative description of a feed: timing, sensor and sink specifications
//! and the optional plant controller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::ContractError;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Feed timing
    #[serde(default)]
    pub feed: FeedSettings,

    /// Sensor specifications, in start order
    #[serde(default)]
    pub sensors: Vec<ComponentSpec>,

    /// Sink specifications, in registration order
    #[serde(default)]
    pub sinks: Vec<ComponentSpec>,

    /// Optional reactive plant controller
    #[serde(default)]
    pub plant_control: Option<PlantControlConfig>,
}

/// Feed timing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Sampling period requested from every sensor (seconds)
    #[serde(default = "default_sensor_period")]
    pub sensor_period_secs: f64,

    /// Wait between dispatch iterations (seconds)
    #[serde(default = "default_poll_wait")]
    pub poll_wait_secs: f64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            sensor_period_secs: default_sensor_period(),
            poll_wait_secs: default_poll_wait(),
        }
    }
}

impl FeedSettings {
    /// Sensor period as a `Duration`
    pub fn sensor_period(&self) -> Duration {
        secs_or(self.sensor_period_secs, default_sensor_period())
    }

    /// Poll wait as a `Duration`
    pub fn poll_wait(&self) -> Duration {
        secs_or(self.poll_wait_secs, default_poll_wait())
    }
}

fn default_sensor_period() -> f64 {
    10.0
}

fn default_poll_wait() -> f64 {
    5.0
}

fn secs_or(secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

/// One sensor or sink entry: a registry kind plus keyword parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Registry key (e.g. "constant", "log")
    pub kind: String,

    /// Optional instance name
    #[serde(default)]
    pub name: Option<String>,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ComponentSpec {
    /// Create a spec with no parameters
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the instance name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Raw string parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parse a parameter, `Ok(None)` when absent
    ///
    /// # Errors
    /// Returns a validation error naming the parameter when it does not parse.
    pub fn parse_param<T>(&self, key: &str) -> Result<Option<T>, ContractError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.param(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                ContractError::config_validation(
                    format!("{}.params.{key}", self.kind),
                    format!("cannot parse '{raw}': {e}"),
                )
            }),
        }
    }
}

/// Threshold direction for the plant controller trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    /// Trigger when the value is strictly above the threshold
    #[default]
    Above,
    /// Trigger when the value is strictly below the threshold
    Below,
}

/// Physical output driven by the plant controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// In-process output, logs transitions
    #[default]
    Memory,
    /// Linux sysfs GPIO line
    SysfsGpio,
}

/// Plant controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantControlConfig {
    /// Parameter name whose readings can trigger an action
    #[serde(default = "default_trigger_param")]
    pub trigger_param: String,

    /// Trigger threshold
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Which side of the threshold triggers
    #[serde(default)]
    pub direction: ThresholdDirection,

    /// How long the output stays active per action (seconds)
    #[serde(default = "default_action_duration")]
    pub action_duration_secs: f64,

    /// Shortest reporting period (seconds), defaults to action duration + 2
    #[serde(default)]
    pub min_period_secs: Option<f64>,

    /// Name reported for the accumulated output
    #[serde(default = "default_output_param")]
    pub param_name: String,

    /// Output driver
    #[serde(default)]
    pub output: OutputKind,

    /// GPIO line for `sysfs_gpio`
    #[serde(default = "default_gpio_pin")]
    pub gpio_pin: u32,
}

impl Default for PlantControlConfig {
    fn default() -> Self {
        Self {
            trigger_param: default_trigger_param(),
            threshold: default_threshold(),
            direction: ThresholdDirection::default(),
            action_duration_secs: default_action_duration(),
            min_period_secs: None,
            param_name: default_output_param(),
            output: OutputKind::default(),
            gpio_pin: default_gpio_pin(),
        }
    }
}

impl PlantControlConfig {
    /// Action duration as a `Duration`
    pub fn action_duration(&self) -> Duration {
        secs_or(self.action_duration_secs, default_action_duration())
    }

    /// Shortest reporting period
    pub fn min_period(&self) -> Duration {
        match self.min_period_secs {
            Some(secs) => secs_or(secs, self.action_duration().as_secs_f64() + 2.0),
            None => self.action_duration().saturating_add(Duration::from_secs(2)),
        }
    }
}

fn default_trigger_param() -> String {
    "soil".to_string()
}

fn default_threshold() -> f64 {
    1300.0
}

fn default_action_duration() -> f64 {
    20.0
}

fn default_output_param() -> String {
    "water_input".to_string()
}

fn default_gpio_pin() -> u32 {
    17
}
