//! Cache error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from cache placement and artifact bookkeeping.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Every candidate base directory failed the create-and-write check.
    #[error("no writable cache location (tried {} candidates)", tried.len())]
    NoWritableLocation {
        /// Candidate directories that were tried, in order.
        tried: Vec<PathBuf>,
    },

    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A metadata or location record could not be encoded.
    #[error("failed to encode record for {path}: {source}")]
    Encode {
        /// Record path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Malformed epoch identifier.
    #[error("invalid cache epoch '{0}' (expected YYYY-Www)")]
    InvalidEpoch(String),

    /// Unknown naming profile.
    #[error("unknown naming profile '{0}' (expected hashed or labeled)")]
    UnknownNaming(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
