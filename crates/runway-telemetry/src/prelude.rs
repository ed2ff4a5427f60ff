//! Prelude module - commonly used types for convenient import.
//!
//! Use `use runway_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{FileLogConfig, LogConfig, LogFormat, LogTarget};

// Setup functions
pub use crate::setup_logging;
