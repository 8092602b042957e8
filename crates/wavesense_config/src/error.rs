//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors that can occur when loading or validating a `wavesense.toml` configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A `[scenarios.<name>]` table names a scenario that does not exist.
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    /// A configuration value is out of range or inconsistent.
    #[error("validation error: {0}")]
    ValidationError(String),
}
