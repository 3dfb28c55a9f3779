//! Actuator error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    /// Driving the physical output failed
    #[error("output '{output}' write failed: {source}")]
    Output {
        output: String,
        #[source]
        source: std::io::Error,
    },

    /// The shutoff timer thread could not be spawned
    #[error("failed to spawn shutoff timer: {0}")]
    TimerSpawn(#[source] std::io::Error),

    /// A plant control setting is unusable
    #[error("invalid plant control setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },
}

impl ActuatorError {
    pub fn output(output: impl Into<String>, source: std::io::Error) -> Self {
        Self::Output {
            output: output.into(),
            source,
        }
    }

    pub fn invalid_setting(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ActuatorError>;
