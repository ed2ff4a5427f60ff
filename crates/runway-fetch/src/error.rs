//! Error types for artifact retrieval.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Hints shown to the user after a download gives up.
pub const NETWORK_HINTS: &[&str] = &[
    "check that this machine has network access",
    "if the host is blocked on your network, try a proxy or VPN",
    "the host may be temporarily unavailable; retry later",
];

/// Errors that can occur while fetching a remote artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The locator cannot be turned into a URL.
    #[error("invalid source locator: {0}")]
    InvalidLocator(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// The request failed before a complete response was received.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// The attempt exceeded its overall timeout.
    #[error("request to {url} timed out after {secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        secs: u64,
    },

    /// The body exceeded the configured maximum size.
    #[error("download too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Bytes received (or announced).
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Writing the destination failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Every attempt failed.
    #[error("download failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<FetchError>,
    },

    /// Recording artifact metadata failed.
    #[error(transparent)]
    Cache(#[from] runway_cache::CacheError),
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Transport { .. } | Self::Timeout { .. }
        )
    }

    /// Remediation hints for the user, empty when none apply.
    #[must_use]
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::Exhausted { last, .. } => last.remediation(),
            Self::Status { .. } | Self::Transport { .. } | Self::Timeout { .. } => NETWORK_HINTS,
            _ => &[],
        }
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(
            FetchError::Status {
                url: "u".into(),
                status: 503
            }
            .is_retryable()
        );
        assert!(
            FetchError::Timeout {
                url: "u".into(),
                secs: 60
            }
            .is_retryable()
        );
        assert!(!FetchError::InvalidLocator("x".into()).is_retryable());
        assert!(!FetchError::TooLarge { size: 2, limit: 1 }.is_retryable());
    }

    #[test]
    fn test_exhausted_carries_hints() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Transport {
                url: "https://example.com/a".into(),
                message: "connection refused".into(),
            }),
        };
        assert_eq!(err.remediation().len(), NETWORK_HINTS.len());
        let text = err.to_string();
        assert!(text.contains("3 attempt"));
        assert!(text.contains("connection refused"));
    }
}
