//! Shared startup for commands that need the runtime.

use std::path::Path;

use anyhow::{Context, Result, bail};
use runway_cache::CacheStore;
use runway_config::{Config, ResolvedConfig};
use runway_core::{MachineIdentity, RunwayHome};
use runway_launcher::{BootstrapError, Bootstrapped, GateError, bootstrap};
use tracing::info;

use crate::config_bridge;
use crate::progress::{follow, spawn_job};
use crate::theme::Theme;

/// Exit status used when the device is not authorized.
pub(crate) const EXIT_DENIED: i32 = 3;

/// Resolved home and configuration for one CLI invocation.
pub(crate) struct CliContext {
    pub(crate) home: RunwayHome,
    pub(crate) resolved: ResolvedConfig,
}

impl CliContext {
    /// Resolve the Runway home and load the layered configuration.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self> {
        let home = RunwayHome::resolve().context("cannot resolve the Runway home directory")?;
        home.ensure()
            .with_context(|| format!("cannot create {}", home.root().display()))?;
        let resolved = Config::load(home.root(), explicit)?;
        Ok(Self { home, resolved })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.resolved.config
    }

    /// Machine identity, detected once per process.
    pub(crate) async fn identity(&self) -> &'static MachineIdentity {
        MachineIdentity::current(&config_bridge::to_identity_options(self.config(), &self.home)).await
    }

    /// Cache placement without running the rest of startup.
    pub(crate) fn cache_store(&self) -> Result<CacheStore> {
        Ok(CacheStore::new(config_bridge::to_store_options(
            self.config(),
            &self.home,
        )?))
    }

    /// Run the startup sequence, showing progress while the authorization
    /// asset syncs.
    ///
    /// A denied device terminates the process with [`EXIT_DENIED`].
    pub(crate) async fn start(&self) -> Result<Bootstrapped> {
        let identity = self.identity().await;
        let options = config_bridge::to_bootstrap_options(self.config(), &self.home)?;

        let rx = spawn_job(move |progress| async move { bootstrap(identity, options, &progress).await });
        let Some(result) = follow("startup", rx).await else {
            bail!("startup interrupted");
        };

        match result {
            Ok(started) => {
                info!(
                    tools = started.launcher.catalog().tool_count(),
                    authorization = ?started.authorization,
                    cache = %started.location.path().display(),
                    "runtime ready"
                );
                Ok(started)
            },
            Err(BootstrapError::Gate(GateError::Denied {
                device_id,
                fingerprint,
            })) => {
                eprintln!("{}", Theme::error("This device is not authorized to run tools."));
                eprintln!();
                eprintln!("  {}", Theme::kv("Device id", &device_id));
                eprintln!("  {}", Theme::kv("Fingerprint", &fingerprint));
                eprintln!();
                eprintln!(
                    "{}",
                    Theme::dimmed("Send the device id to your administrator to request access.")
                );
                std::process::exit(EXIT_DENIED);
            },
            Err(e) => Err(e).context("startup failed"),
        }
    }
}
