//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur while installing the global subscriber
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed, or the filter was rejected
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// A log level string could not be understood
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}
