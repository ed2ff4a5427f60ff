//! Errors raised while loading Runway configuration layers.

use std::io;

use thiserror::Error;

/// Why a configuration layer could not be used.
///
/// `path` is the file the layer came from, or a placeholder such as
/// `<embedded defaults>` for layers with no file behind them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layer file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    ReadError {
        /// Layer file.
        path: String,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// The layer is not valid TOML, or does not fit the [`Config`](crate::Config) shape.
    #[error("invalid TOML in {path}: {source}")]
    ParseError {
        /// Layer file.
        path: String,
        /// Deserializer failure.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration is inconsistent.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the offending key (e.g. `tools.merger.source`).
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The layer file is larger than Runway accepts.
    #[error("{path} is {size} bytes; configuration files are limited to {limit} bytes")]
    TooLarge {
        /// Layer file.
        path: String,
        /// Size on disk.
        size: u64,
        /// Accepted maximum.
        limit: u64,
    },
}

/// Shorthand for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
