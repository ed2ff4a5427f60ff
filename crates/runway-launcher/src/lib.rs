//! Runway Launcher - authorization, provisioning and tool supervision.
//!
//! This crate provides:
//! - The tool and asset [`Catalog`]
//! - The [`DeviceAuthorizationGate`], whose approval token is required to
//!   build a [`Launcher`]
//! - Runtime dependency provisioning through a [`PackageManager`]
//! - The [`ToolProcessSupervisor`] process table and the [`Launcher`]
//!   pipeline that feeds it
//! - Interface asset synchronization with local fallbacks
//! - The [`bootstrap`] startup sequence

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod assets;
pub mod bootstrap;
pub mod catalog;
pub mod error;
pub mod gate;
pub mod launcher;
pub mod process;
pub mod provision;
pub mod supervisor;

pub use assets::{AssetStatus, AssetSync, LoadedAsset};
pub use bootstrap::{BootstrapOptions, Bootstrapped, bootstrap};
pub use catalog::{AssetSpec, Catalog, ToolId, ToolSpec, is_valid_id};
pub use error::{AssetReadError, BootstrapError, GateError, LaunchError, LaunchResult, ProvisionError, ProvisionResult};
pub use gate::{AllowList, AuthorizationMode, Authorized, DeviceAuthorizationGate};
pub use launcher::{LaunchOutcome, Launcher, LauncherParts, ToolOverview, UpdateFailure, UpdateReport};
pub use process::{
    LAUNCH_MARKER_ENV, OsProcess, OsSpawner, ProcessHandle, ProcessSpawner, SpawnRequest, launched_by_runway,
    marker_is_set,
};
pub use provision::{
    DEFAULT_CHECK_TIMEOUT, DEFAULT_INSTALL_TIMEOUT, DependencyProvisioner, PackageManager, PipPackageManager,
};
pub use supervisor::{LaunchTicket, TerminateReport, ToolProcessSupervisor, ToolState};
