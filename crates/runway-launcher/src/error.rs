//! Error types for authorization, provisioning and launch.

use std::io;
use std::path::PathBuf;

use runway_cache::CacheError;
use runway_fetch::FetchError;
use thiserror::Error;

use crate::catalog::ToolId;

/// Device authorization failures.
#[derive(Debug, Error)]
pub enum GateError {
    /// This device is not on the allow-list.
    #[error(
        "this device is not authorized to run tools (device id: {device_id}); \
         send the device id to your administrator"
    )]
    Denied {
        /// Raw device identifier to hand to an administrator.
        device_id: String,
        /// Short fingerprint shown alongside it.
        fingerprint: String,
    },
}

/// Dependency provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The interpreter used to drive the package manager is missing.
    #[error("interpreter '{program}' not found on PATH")]
    InterpreterNotFound {
        /// Program that was looked up.
        program: String,
    },

    /// The package manager could not be started.
    #[error("failed to run package manager for '{package}': {source}")]
    Spawn {
        /// Package being handled.
        package: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A query or install exceeded its timeout.
    #[error("{action} of '{package}' timed out after {secs}s")]
    Timeout {
        /// Package being handled.
        package: String,
        /// `"check"` or `"install"`.
        action: &'static str,
        /// Timeout that elapsed.
        secs: u64,
    },

    /// The installer exited unsuccessfully.
    #[error("installing '{package}' failed (exit code {code:?}): {stderr}")]
    InstallFailed {
        /// Package that failed.
        package: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Trimmed installer diagnostics.
        stderr: String,
    },
}

/// Launch failures.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No tool with this id is configured.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The tool is already live or being launched.
    #[error("tool '{0}' is already running")]
    AlreadyRunning(ToolId),

    /// Runtime dependencies could not be provisioned.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// The artifact could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache bookkeeping failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The runner declared by the tool is missing.
    #[error("runner '{runner}' for tool '{tool}' not found on PATH")]
    RunnerNotFound {
        /// Tool being launched.
        tool: ToolId,
        /// Runner that was looked up.
        runner: String,
    },

    /// The OS refused to start the process.
    #[error("failed to start '{tool}': {source}")]
    Spawn {
        /// Tool being launched.
        tool: ToolId,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Filesystem error around the artifact.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The launch task ended without producing a result.
    #[error("launch of '{tool}' aborted: {reason}")]
    Aborted {
        /// Tool being launched.
        tool: String,
        /// Why it ended.
        reason: String,
    },
}

impl LaunchError {
    /// Remediation hints for the user, empty when none apply.
    #[must_use]
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::Fetch(e) => e.remediation(),
            _ => &[],
        }
    }
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// No cache location could be established.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The device is not authorized.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The allow-list exists locally but could not be read.
    #[error(transparent)]
    Asset(#[from] AssetReadError),
}

/// A local asset copy exists but its bytes could not be read.
#[derive(Debug, Error)]
#[error("cannot read asset {path}: {source}")]
pub struct AssetReadError {
    /// Local copy that failed.
    pub path: PathBuf,
    /// I/O failure.
    #[source]
    pub source: io::Error,
}

/// Result type for launch operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
