//! Configuration loading traits and shared config sections.
//!
//! Every servo config file is TOML. Any `serde`-deserialisable type can be
//! loaded through [`ConfigLoader`]; semantic checks live in each type's
//! `validate()`.
//!
//! ```rust,no_run
//! use servo_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct BenchConfig {
//!     #[serde(default)]
//!     shared: SharedConfig,
//!     iterations: u32,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BenchConfig::load(Path::new("bench.toml"))?;
//!     config.shared.validate()?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// File could not be read for a reason other than absence.
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Maximum `tracing` level enabled at this verbosity.
    pub const fn as_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Common fields shared by every servo binary.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "servo-bench-01"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier used in log output.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "servo".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a configuration value from a TOML file or string.
///
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ReadError` for any other I/O failure
/// - `ConfigError::ParseError` if the TOML is malformed or mistyped
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::ReadError(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_toml(&content)
    }

    /// Parse an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
