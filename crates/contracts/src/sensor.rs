//! Sensor capability
//!
//! A sensor owns its own sampling worker and produces one reading per period
//! into the queue it was started with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ContractError, ReadingSender, SensorError, SensorId};

/// Data type of the sensed parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Float,
    Integer,
}

/// Allowed sampling period range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodBounds {
    min: Option<Duration>,
    max: Option<Duration>,
}

impl PeriodBounds {
    /// No constraint on either side
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    /// Lower bound only
    pub fn at_least(min: Duration) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Create bounds, rejecting `min > max`
    pub fn new(min: Option<Duration>, max: Option<Duration>) -> Result<Self, ContractError> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ContractError::config_validation(
                    "min_period / max_period",
                    format!("min_period ({lo:?}) must be <= max_period ({hi:?})"),
                ));
            }
        }
        Ok(Self { min, max })
    }

    /// Shortest allowed period
    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    /// Longest allowed period
    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    /// Validate a requested period, never clamping
    pub fn check(&self, sensor: &SensorId, period: Duration) -> Result<(), SensorError> {
        if let Some(min) = self.min {
            if period < min {
                return Err(SensorError::period_too_short(sensor.clone(), period, min));
            }
        }
        if let Some(max) = self.max {
            if period > max {
                return Err(SensorError::period_too_long(sensor.clone(), period, max));
            }
        }
        Ok(())
    }
}

/// Static identity of a sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDescriptor {
    /// Display name, passed to sinks as the parameter name
    pub name: String,

    /// Stable identifier
    pub id: SensorId,

    /// Unit of the parameter
    pub unit: String,

    /// Allowed sampling periods
    pub bounds: PeriodBounds,

    /// Data type of the values
    pub value_type: ValueType,
}

impl SensorDescriptor {
    /// Create an unbounded float descriptor
    pub fn new(name: impl Into<String>, id: impl Into<SensorId>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            unit: unit.into(),
            bounds: PeriodBounds::UNBOUNDED,
            value_type: ValueType::Float,
        }
    }

    /// Replace the period bounds
    pub fn with_bounds(mut self, bounds: PeriodBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Replace the value type
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Validate a requested period against this descriptor's bounds
    pub fn check_period(&self, period: Duration) -> Result<(), SensorError> {
        self.bounds.check(&self.id, period)
    }
}

/// Sensor capability consumed by the feed controller
///
/// Implementations use interior mutability so one instance can be shared
/// between the controller and other owners (e.g. a device and its children).
pub trait Sensor: Send + Sync {
    /// Static identity
    fn descriptor(&self) -> &SensorDescriptor;

    /// Start sampling into `queue` every `period`
    ///
    /// # Errors
    /// - `InvalidPeriod` if `period` is outside the allowed range
    /// - `AlreadyRunning` / `DuplicateChild` if started twice without `stop`
    fn start(&self, queue: ReadingSender, period: Duration) -> Result<(), SensorError>;

    /// Stop sampling
    ///
    /// With `join = true` this blocks until the worker has exited, so no
    /// reading arrives after it returns. Stopping an idle sensor is a no-op.
    /// A worker that already failed reports its failure here.
    fn stop(&self, join: bool) -> Result<(), SensorError>;

    /// Whether a live worker is currently producing for this sensor
    fn is_running(&self) -> bool;
}
