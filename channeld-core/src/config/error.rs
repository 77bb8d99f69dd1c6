//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Cannot write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Malformed TOML in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Cannot encode configuration: {0}")]
    Encode(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
