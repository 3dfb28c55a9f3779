//! Component factory error types

use actuator::ActuatorError;
use contracts::ContractError;
use dispatcher::FeedError;
use thiserror::Error;

/// Errors raised while turning a blueprint into live components
#[derive(Debug, Error)]
pub enum FactoryError {
    /// No constructor registered for a kind
    #[error("unknown {category} kind '{kind}' (known: {known})")]
    UnknownKind {
        category: &'static str,
        kind: String,
        known: String,
    },

    /// A parameter is missing or unusable
    #[error("invalid parameter for '{component}': {message}")]
    InvalidParam { component: String, message: String },

    /// The plant controller output could not be opened
    #[error("failed to open output '{output}': {source}")]
    Output {
        output: String,
        #[source]
        source: std::io::Error,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Wrapped FeedError (sink creation)
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Wrapped ActuatorError
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

impl FactoryError {
    /// Create an invalid-parameter error
    pub fn invalid_param(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, FactoryError>;
