//! Telemetry error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level, directive or format string could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// The log file directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    LogDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
