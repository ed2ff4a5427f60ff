//! Runtime dependency provisioning.
//!
//! Before a tool starts, each of its required packages is checked and
//! installed if missing. The first failed install aborts the rest.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use runway_core::ProgressSink;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::catalog::ToolId;
use crate::error::{ProvisionError, ProvisionResult};

/// Default timeout for checking a single package.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for installing a single package.
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Queries and installs packages.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Whether `package` is already installed.
    async fn is_installed(&self, package: &str) -> ProvisionResult<bool>;

    /// Install `package`.
    async fn install(&self, package: &str) -> ProvisionResult<()>;
}

/// `pip` driven through a Python interpreter.
#[derive(Debug, Clone)]
pub struct PipPackageManager {
    python: String,
    index_url: Option<String>,
    check_timeout: Duration,
    install_timeout: Duration,
}

impl PipPackageManager {
    /// Use `python` (a program name or path).
    #[must_use]
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            index_url: None,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }

    /// Install from a mirror instead of the default index.
    #[must_use]
    pub fn with_index_url(mut self, url: Option<String>) -> Self {
        self.index_url = url;
        self
    }

    /// Override both timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, check: Duration, install: Duration) -> Self {
        self.check_timeout = check;
        self.install_timeout = install;
        self
    }

    /// Interpreter this manager drives.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Resolve the interpreter on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InterpreterNotFound`] if it cannot be found.
    pub fn resolve_python(&self) -> ProvisionResult<PathBuf> {
        which::which(&self.python).map_err(|_| ProvisionError::InterpreterNotFound {
            program: self.python.clone(),
        })
    }

    /// Arguments for the install command.
    #[must_use]
    pub fn install_args(&self, package: &str) -> Vec<String> {
        let mut args = vec!["-m".to_owned(), "pip".to_owned(), "install".to_owned()];
        if let Some(url) = &self.index_url {
            args.push("--index-url".to_owned());
            args.push(url.clone());
        }
        args.push(package.to_owned());
        args
    }

    fn command(python: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(python);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PackageManager for PipPackageManager {
    async fn is_installed(&self, package: &str) -> ProvisionResult<bool> {
        let python = self.resolve_python()?;
        let args = ["-m", "pip", "show", package].map(str::to_owned);
        let output = timeout(self.check_timeout, Self::command(&python, &args).output())
            .await
            .map_err(|_| ProvisionError::Timeout {
                package: package.to_owned(),
                action: "check",
                secs: self.check_timeout.as_secs(),
            })?
            .map_err(|e| ProvisionError::Spawn {
                package: package.to_owned(),
                source: e,
            })?;
        Ok(output.status.success())
    }

    async fn install(&self, package: &str) -> ProvisionResult<()> {
        let python = self.resolve_python()?;
        let args = self.install_args(package);
        debug!(package, index_url = ?self.index_url, "installing package");
        let output = timeout(self.install_timeout, Self::command(&python, &args).output())
            .await
            .map_err(|_| ProvisionError::Timeout {
                package: package.to_owned(),
                action: "install",
                secs: self.install_timeout.as_secs(),
            })?
            .map_err(|e| ProvisionError::Spawn {
                package: package.to_owned(),
                source: e,
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ProvisionError::InstallFailed {
            package: package.to_owned(),
            code: output.status.code(),
            stderr: last_lines(&stderr, 5),
        })
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Ensures a tool's packages are present.
#[derive(Clone)]
pub struct DependencyProvisioner {
    manager: Arc<dyn PackageManager>,
}

impl std::fmt::Debug for DependencyProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyProvisioner").finish_non_exhaustive()
    }
}

impl DependencyProvisioner {
    /// Provisioner backed by `manager`.
    #[must_use]
    pub fn new(manager: Arc<dyn PackageManager>) -> Self {
        Self { manager }
    }

    /// Check and install every package for `tool`, in order.
    ///
    /// Progress is the fraction of the list traversed, on a `0..=100`
    /// scale.
    ///
    /// # Errors
    ///
    /// Returns the first check or install error; later packages are not
    /// attempted.
    #[allow(clippy::cast_precision_loss)]
    pub async fn ensure_ready(
        &self,
        tool: &ToolId,
        packages: &[String],
        progress: &dyn ProgressSink,
    ) -> ProvisionResult<()> {
        if packages.is_empty() {
            progress.report(100.0, "No dependencies required");
            return Ok(());
        }

        let total = packages.len() as f32;
        for (index, package) in packages.iter().enumerate() {
            progress.report(
                index as f32 / total * 100.0,
                &format!("Checking dependency {package}"),
            );
            if self.manager.is_installed(package).await? {
                debug!(%tool, package, "dependency present");
                continue;
            }
            info!(%tool, package, "installing missing dependency");
            progress.report(
                index as f32 / total * 100.0,
                &format!("Installing dependency {package}"),
            );
            if let Err(e) = self.manager.install(package).await {
                warn!(%tool, package, error = %e, "dependency install failed");
                return Err(e);
            }
        }
        progress.report(100.0, "Dependencies ready");
        Ok(())
    }
}
