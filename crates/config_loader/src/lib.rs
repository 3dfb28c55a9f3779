//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `FeedBlueprint`, falling back to the built-in defaults
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("feed.toml")).unwrap();
//! println!("sensors: {}", blueprint.sensors.len());
//! ```

mod parser;
mod validator;

pub use contracts::FeedBlueprint;
pub use parser::ConfigFormat;

use contracts::{ComponentSpec, ConfigVersion, ContractError, FeedSettings};
use std::path::Path;
use tracing::{debug, info};

/// Built-in configuration used when no file is given
///
/// Three demo sensors plus a second constant ("Norwegian Blue", 5), all
/// logged.
pub fn defaults() -> FeedBlueprint {
    FeedBlueprint {
        version: ConfigVersion::V1,
        feed: FeedSettings::default(),
        sensors: vec![
            ComponentSpec::new("rise_and_fall"),
            ComponentSpec::new("cpu_load_average"),
            ComponentSpec::new("constant"),
            ComponentSpec::new("constant")
                .with_param("value", "5")
                .with_param("name", "Norwegian Blue"),
        ],
        sinks: vec![ComponentSpec::new("log")],
        plant_control: None,
    }
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<FeedBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        info!(path = %path.display(), ?format, "loading config");
        Self::load_from_str(&content, format)
    }

    /// Load `path` if given, the built-in defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<FeedBlueprint, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                debug!("no config file given, using built-in defaults");
                Ok(defaults())
            }
        }
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FeedBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an in-memory blueprint (e.g. after command line overrides)
    pub fn validate(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize FeedBlueprint to TOML string
    pub fn to_toml(blueprint: &FeedBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize FeedBlueprint to JSON string
    pub fn to_json(blueprint: &FeedBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FeedBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}
