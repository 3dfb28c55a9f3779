//! Layered error definitions
//!
//! Categorized by source: sensor / sink / config

use std::time::Duration;

use thiserror::Error;

use crate::SensorId;

/// Errors raised by sensors, devices and their sampling workers
#[derive(Debug, Error)]
pub enum SensorError {
    /// Requested sampling period outside the allowed range
    #[error("invalid period for '{sensor}': requested {requested:?} is {reason}")]
    InvalidPeriod {
        sensor: SensorId,
        requested: Duration,
        reason: String,
    },

    /// `start` called on a sensor whose worker is still registered
    #[error("sensor '{sensor}' already running")]
    AlreadyRunning { sensor: SensorId },

    /// `start` called on a device child that is already registered
    #[error("child sensor '{child}' of device '{device}' already running")]
    DuplicateChild { device: String, child: SensorId },

    /// Value production could not finish inside its own period
    #[error(
        "sensor '{sensor}' too slow: unable to get reading in configured period of {period:?} \
         (overran by {overrun:?})"
    )]
    SamplingTooSlow {
        sensor: SensorId,
        period: Duration,
        overrun: Duration,
    },

    /// A single read from the hardware failed
    #[error("read failed for sensor '{sensor}': {message}")]
    ReadFailed { sensor: SensorId, message: String },

    /// The sampling worker panicked
    #[error("sampling worker for '{sensor}' panicked")]
    WorkerPanicked { sensor: SensorId },

    /// The sampling worker could not be spawned
    #[error("failed to spawn sampling worker for '{sensor}': {source}")]
    Spawn {
        sensor: SensorId,
        #[source]
        source: std::io::Error,
    },
}

impl SensorError {
    /// Create an invalid-period error for a period below the minimum
    pub fn period_too_short(sensor: impl Into<SensorId>, requested: Duration, min: Duration) -> Self {
        Self::InvalidPeriod {
            sensor: sensor.into(),
            requested,
            reason: format!("too short, must be at least {min:?}"),
        }
    }

    /// Create an invalid-period error for a period above the maximum
    pub fn period_too_long(sensor: impl Into<SensorId>, requested: Duration, max: Duration) -> Self {
        Self::InvalidPeriod {
            sensor: sensor.into(),
            requested,
            reason: format!("too long, must be at most {max:?}"),
        }
    }

    /// Create a read failure
    pub fn read_failed(sensor: impl Into<SensorId>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            sensor: sensor.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by sinks
#[derive(Debug, Error)]
pub enum SinkError {
    /// Processing a single reading failed
    #[error("sink '{sink_name}' failed to process '{param}': {message}")]
    Process {
        sink_name: String,
        param: String,
        message: String,
    },

    /// Flushing buffered state on finalise failed
    #[error("sink '{sink_name}' failed to finalise: {message}")]
    Finalise { sink_name: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create a processing error
    pub fn process(
        sink_name: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Process {
            sink_name: sink_name.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a finalise error
    pub fn finalise(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Finalise {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_period_message() {
        let err = SensorError::period_too_short(
            "soil",
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        let msg = err.to_string();
        assert!(msg.contains("soil"));
        assert!(msg.contains("too short"));
    }

    #[test]
    fn test_sink_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: SinkError = io.into();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
