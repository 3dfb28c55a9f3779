//! Feed controller error types

use contracts::{SensorError, SensorId};
use thiserror::Error;

/// Controller-level errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// A sensor refused to start; the remaining starts were skipped
    #[error("failed to start sensor '{sensor}': {source}")]
    SensorStart {
        sensor: SensorId,
        #[source]
        source: SensorError,
    },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
