//! Runway Core - Foundation types for the Runway tool orchestrator.
//!
//! This crate provides:
//! - Machine identity derivation (stable per-host fingerprint)
//! - The Runway home directory layout
//! - The progress reporting channel shared by fetch, provisioning and launch
//! - Retry policies for transient failures

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod dirs;
pub mod identity;
pub mod progress;
pub mod retry;

pub use dirs::RunwayHome;
pub use identity::{IdentityOptions, IdentitySource, MachineFingerprint, MachineIdentity, RawIdentity};
pub use progress::{FnProgress, NoProgress, ProgressRange, ProgressSink, format_size};
pub use retry::{RetryConfig, RetryOutcome, retry};
