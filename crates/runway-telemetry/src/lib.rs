//! Runway Telemetry - Logging setup for the Runway tool orchestrator.
//!
//! Builds a `tracing` subscriber from a [`LogConfig`]: an `EnvFilter`, one
//! console layer (stdout or stderr) in the chosen format, and an optional
//! rolling file layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use runway_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), runway_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("runway_fetch=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileLogConfig, LogConfig, LogFormat, LogTarget, setup_logging};
