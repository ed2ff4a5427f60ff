//! Tool launch pipeline.
//!
//! `launch(tool)` runs: slot reservation -> dependency provisioning ->
//! cache validity check -> conditional download -> spawn. Progress is
//! reported on one `0..=100` scale: provisioning takes `0..30`, the download
//! `30..95`, and the spawn completes it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use runway_cache::{ArtifactKind, ArtifactMeta, ArtifactStore, TtlPolicy};
use runway_core::{ProgressRange, ProgressSink};
use runway_fetch::{ArtifactTarget, Fetcher};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ToolId, ToolSpec};
use crate::error::{LaunchError, LaunchResult};
use crate::gate::{AuthorizationMode, Authorized};
use crate::process::{ProcessHandle, ProcessSpawner, SpawnRequest};
use crate::provision::DependencyProvisioner;
use crate::supervisor::{TerminateReport, ToolProcessSupervisor, ToolState};

const PROVISION_END: f32 = 30.0;
const DOWNLOAD_END: f32 = 95.0;

/// Result of one launch request.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The tool process was started.
    Launched {
        /// Tool started.
        tool: ToolId,
        /// OS process id.
        pid: Option<u32>,
        /// Whether the artifact was downloaded for this launch.
        downloaded: bool,
    },
    /// The tool is already launching or running; nothing was done.
    AlreadyRunning(ToolId),
    /// The launch failed.
    Failed {
        /// Requested tool id.
        tool: String,
        /// Why it failed.
        error: LaunchError,
    },
}

impl LaunchOutcome {
    /// Whether a process was started.
    #[must_use]
    pub fn is_launched(&self) -> bool {
        matches!(self, Self::Launched { .. })
    }
}

/// A tool together with its live state and cache status.
#[derive(Debug, Clone)]
pub struct ToolOverview {
    /// Catalog entry.
    pub spec: ToolSpec,
    /// Process state.
    pub state: ToolState,
    /// Cached artifact, if any.
    pub cached: Option<ArtifactMeta>,
    /// Time until the cached artifact expires, if it is valid.
    pub expires_in: Option<TimeDelta>,
}

/// Tools refreshed by [`Launcher::update_all`].
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Tools downloaded, with their sizes.
    pub updated: Vec<(ToolId, u64)>,
    /// Cached tool artifacts invalidated before downloading.
    pub invalidated: usize,
}

/// First tool that failed during [`Launcher::update_all`].
#[derive(Debug)]
pub struct UpdateFailure {
    /// Tool that failed.
    pub tool: ToolId,
    /// Why.
    pub error: LaunchError,
    /// Tools already refreshed before the failure.
    pub updated: Vec<(ToolId, u64)>,
}

/// Everything a [`Launcher`] is built from, apart from the authorization.
pub struct LauncherParts {
    /// Configured tools and assets.
    pub catalog: Catalog,
    /// Artifact store inside the current cache location.
    pub store: ArtifactStore,
    /// Freshness policy.
    pub policy: TtlPolicy,
    /// Artifact fetcher.
    pub fetcher: Fetcher,
    /// Dependency provisioner.
    pub provisioner: DependencyProvisioner,
    /// Process spawner.
    pub spawner: Arc<dyn ProcessSpawner>,
}

struct Inner {
    authorized: Authorized,
    catalog: Catalog,
    store: ArtifactStore,
    policy: TtlPolicy,
    fetcher: Fetcher,
    provisioner: DependencyProvisioner,
    spawner: Arc<dyn ProcessSpawner>,
    supervisor: ToolProcessSupervisor,
}

/// Launches and tracks tools. Cheap to clone; clones share the process
/// table.
#[derive(Clone)]
pub struct Launcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("tools", &self.inner.catalog.tool_count())
            .field("authorization", &self.inner.authorized.mode())
            .field("supervisor", &self.inner.supervisor)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Build a launcher. Requires proof of authorization.
    #[must_use]
    pub fn new(authorized: Authorized, parts: LauncherParts) -> Self {
        Self {
            inner: Arc::new(Inner {
                authorized,
                catalog: parts.catalog,
                store: parts.store,
                policy: parts.policy,
                fetcher: parts.fetcher,
                provisioner: parts.provisioner,
                spawner: parts.spawner,
                supervisor: ToolProcessSupervisor::new(),
            }),
        }
    }

    /// How this device was authorized.
    #[must_use]
    pub fn authorization(&self) -> AuthorizationMode {
        self.inner.authorized.mode()
    }

    /// Configured tools and assets.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The process table.
    #[must_use]
    pub fn supervisor(&self) -> &ToolProcessSupervisor {
        &self.inner.supervisor
    }

    /// Artifact store of the current cache location.
    #[must_use]
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.inner.store
    }

    /// Every tool with its state and cache freshness.
    #[must_use]
    pub fn overview(&self) -> Vec<ToolOverview> {
        let now = Utc::now();
        self.inner
            .catalog
            .tools()
            .map(|spec| {
                let cached = self.inner.store.read_meta(ArtifactKind::Tool, spec.id.as_str());
                let expires_in = cached
                    .as_ref()
                    .filter(|m| self.inner.policy.is_valid_at(Some(m), ArtifactKind::Tool, now))
                    .and_then(|m| self.inner.policy.remaining_at(m, now));
                ToolOverview {
                    spec: spec.clone(),
                    state: self.inner.supervisor.state(&spec.id),
                    cached,
                    expires_in,
                }
            })
            .collect()
    }

    /// Launch `tool_id`. Never panics; every failure becomes
    /// [`LaunchOutcome::Failed`].
    pub async fn launch(&self, tool_id: &str, progress: &dyn ProgressSink) -> LaunchOutcome {
        let Some(spec) = self.inner.catalog.tool(tool_id) else {
            return LaunchOutcome::Failed {
                tool: tool_id.to_owned(),
                error: LaunchError::UnknownTool(tool_id.to_owned()),
            };
        };
        let Some(ticket) = self.inner.supervisor.begin_launch(&spec.id) else {
            info!(tool = %spec.id, "tool already running, launch skipped");
            return LaunchOutcome::AlreadyRunning(spec.id.clone());
        };

        match self.run(spec, progress).await {
            Ok((handle, downloaded)) => {
                let pid = handle.id();
                ticket.commit(handle);
                progress.report(100.0, &format!("{} started", spec.name));
                info!(tool = %spec.id, ?pid, downloaded, "tool launched");
                LaunchOutcome::Launched {
                    tool: spec.id.clone(),
                    pid,
                    downloaded,
                }
            },
            Err(error) => {
                warn!(tool = %spec.id, error = %error, "launch failed");
                LaunchOutcome::Failed {
                    tool: spec.id.to_string(),
                    error,
                }
            },
        }
    }

    async fn run(
        &self,
        spec: &ToolSpec,
        progress: &dyn ProgressSink,
    ) -> LaunchResult<(Box<dyn ProcessHandle>, bool)> {
        let provision_progress = ProgressRange::new(progress, 0.0, PROVISION_END);
        self.inner
            .provisioner
            .ensure_ready(&spec.id, &spec.packages, &provision_progress)
            .await?;

        let (artifact, downloaded) = self.ensure_artifact(spec, progress).await?;
        prepare_executable(spec, &artifact)?;

        let request = self.spawn_request(spec, &artifact)?;
        let handle = self
            .inner
            .spawner
            .spawn(&request)
            .map_err(|e| LaunchError::Spawn {
                tool: spec.id.clone(),
                source: e,
            })?;
        Ok((handle, downloaded))
    }

    /// Valid cached artifact path, downloading it first if needed.
    async fn ensure_artifact(
        &self,
        spec: &ToolSpec,
        progress: &dyn ProgressSink,
    ) -> LaunchResult<(PathBuf, bool)> {
        let meta = self.inner.store.read_meta(ArtifactKind::Tool, spec.id.as_str());
        if let Some(meta) = meta.filter(|m| self.inner.policy.is_valid(Some(m), ArtifactKind::Tool)) {
            debug!(tool = %spec.id, path = %meta.path.display(), "using cached artifact");
            progress.report(DOWNLOAD_END, &format!("Using cached {}", spec.name));
            return Ok((meta.path, false));
        }

        let download_progress = ProgressRange::new(progress, PROVISION_END, DOWNLOAD_END);
        let meta = self
            .inner
            .fetcher
            .fetch_artifact(&self.inner.store, target(spec), &spec.source, &download_progress)
            .await?;
        Ok((meta.path, true))
    }

    fn spawn_request(&self, spec: &ToolSpec, artifact: &Path) -> LaunchResult<SpawnRequest> {
        let mut request = match &spec.runner {
            Some(runner) => {
                let program = which::which(runner).map_err(|_| LaunchError::RunnerNotFound {
                    tool: spec.id.clone(),
                    runner: runner.clone(),
                })?;
                SpawnRequest::new(program).arg(artifact)
            },
            None => SpawnRequest::new(artifact),
        };
        for arg in &spec.args {
            request = request.arg(arg);
        }
        if let Some(dir) = artifact.parent() {
            request = request.current_dir(dir);
        }
        Ok(request)
    }

    /// Invalidate every cached tool and download all of them again.
    ///
    /// # Errors
    ///
    /// Stops at the first tool that fails and reports it by id.
    #[allow(clippy::cast_precision_loss)]
    pub async fn update_all(&self, progress: &dyn ProgressSink) -> Result<UpdateReport, UpdateFailure> {
        let first_tool = || self.inner.catalog.tools().next().map(|t| t.id.clone());
        let invalidated = match self.inner.store.invalidate(ArtifactKind::Tool) {
            Ok(n) => n,
            Err(e) => {
                let Some(tool) = first_tool() else {
                    return Ok(UpdateReport::default());
                };
                return Err(UpdateFailure {
                    tool,
                    error: e.into(),
                    updated: Vec::new(),
                });
            },
        };

        let total = self.inner.catalog.tool_count().max(1) as f32;
        let mut updated = Vec::new();
        for (index, spec) in self.inner.catalog.tools().enumerate() {
            let start = index as f32 / total * 100.0;
            let end = (index as f32 + 1.0) / total * 100.0;
            let labeled = Labeled {
                inner: progress,
                label: &spec.name,
            };
            let range = ProgressRange::new(&labeled, start, end);
            match self
                .inner
                .fetcher
                .fetch_artifact(&self.inner.store, target(spec), &spec.source, &range)
                .await
            {
                Ok(meta) => updated.push((spec.id.clone(), meta.size)),
                Err(e) => {
                    warn!(tool = %spec.id, error = %e, "update failed");
                    return Err(UpdateFailure {
                        tool: spec.id.clone(),
                        error: e.into(),
                        updated,
                    });
                },
            }
        }
        info!(count = updated.len(), invalidated, "tools updated");
        Ok(UpdateReport {
            updated,
            invalidated,
        })
    }

    /// Stop every running tool.
    pub fn shutdown(&self) -> TerminateReport {
        self.inner.supervisor.terminate_all()
    }
}

fn target(spec: &ToolSpec) -> ArtifactTarget<'_> {
    ArtifactTarget {
        id: spec.id.as_str(),
        kind: ArtifactKind::Tool,
        file_name: &spec.file_name,
    }
}

/// Prefixes progress messages with a tool name.
struct Labeled<'a> {
    inner: &'a dyn ProgressSink,
    label: &'a str,
}

impl ProgressSink for Labeled<'_> {
    fn report(&self, percent: f32, message: &str) {
        self.inner.report(percent, &format!("{}: {message}", self.label));
    }
}

/// Directly executed artifacts need the executable bit on Unix.
#[cfg(unix)]
fn prepare_executable(spec: &ToolSpec, artifact: &Path) -> LaunchResult<()> {
    use std::os::unix::fs::PermissionsExt;

    if spec.runner.is_some() {
        return Ok(());
    }
    std::fs::set_permissions(artifact, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        LaunchError::Io {
            path: artifact.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn prepare_executable(_spec: &ToolSpec, _artifact: &Path) -> LaunchResult<()> {
    Ok(())
}
