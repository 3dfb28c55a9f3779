//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::FeedError;
use factory::FactoryError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Parsing or validating the configuration failed
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Building components from the configuration failed
    #[error("Failed to build components: {0}")]
    Resolve(#[from] FactoryError),

    /// The feed failed to start
    #[error("Feed failed: {0}")]
    Feed(#[from] FeedError),

    /// Serializing command output failed
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Validation reported the configuration as unusable
    #[error("Configuration validation failed: {path}")]
    Invalid { path: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
