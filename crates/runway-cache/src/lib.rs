//! Runway Cache - where downloaded tools and assets live.
//!
//! This crate provides:
//! - Weekly cache epochs and the directory naming profiles built on them
//! - Cache location discovery with a persisted location record
//! - Pruning of directories left over from earlier epochs
//! - Per-artifact metadata sidecars and TTL-based freshness

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod artifact;
pub mod epoch;
pub mod error;
pub mod hide;
pub mod naming;
pub mod prune;
pub mod record;
pub mod store;
pub mod validity;

pub use artifact::{ArtifactKind, ArtifactMeta, ArtifactStore};
pub use epoch::CacheEpoch;
pub use error::{CacheError, CacheResult};
pub use naming::NamingProfile;
pub use prune::{PruneFailure, PruneReport};
pub use record::LocationRecord;
pub use store::{CacheLocation, CacheStore, StoreOptions, default_base_dirs};
pub use validity::{DEFAULT_TTL, TtlPolicy};
