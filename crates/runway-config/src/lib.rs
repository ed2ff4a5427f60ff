#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for Runway.
//!
//! This crate provides a single [`Config`] type holding every knob the
//! orchestrator reads: identity probing, cache placement and TTLs, fetch
//! endpoints, the authorization asset, provisioning, logging, and the tool
//! and asset catalogs.
//!
//! # Usage
//!
//! ```rust,no_run
//! use runway_config::Config;
//!
//! let resolved = Config::load(std::path::Path::new("/home/me/.runway"), None).unwrap();
//! println!("{} tools configured", resolved.config.tools.len());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit** file passed with `--config`
//! 2. **User** (`~/.runway/config.toml`, or `$RUNWAY_HOME/config.toml`)
//! 3. **System** (`/etc/runway/config.toml`)
//! 4. **Environment variables** (`RUNWAY_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! This crate has no dependencies on other internal runway crates. Domain
//! types are built from the config at the CLI boundary.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with source tracking.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(
        runway_home: &std::path::Path,
        explicit: Option<&std::path::Path>,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(runway_home, explicit)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
