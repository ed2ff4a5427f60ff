//! Prelude module - commonly used types for convenient import.
//!
//! Use `use runway_core::prelude::*;` to import all essential types.

// Identity
pub use crate::{IdentityOptions, IdentitySource, MachineFingerprint, MachineIdentity, RawIdentity};

// Directories
pub use crate::RunwayHome;

// Progress
pub use crate::{FnProgress, NoProgress, ProgressRange, ProgressSink};

// Retry
pub use crate::{RetryConfig, RetryOutcome};
