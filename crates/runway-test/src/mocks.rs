//! Mock implementations of the transport, spawner and package manager seams.

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use runway_core::ProgressSink;
use runway_fetch::{FetchError, FetchRequest, FetchResult, Transport};
use runway_launcher::{PackageManager, ProcessHandle, ProcessSpawner, ProvisionError, ProvisionResult, SpawnRequest};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Successful body.
    Body(Vec<u8>),
    /// Non-success HTTP status.
    Status(u16),
    /// Connection-level failure.
    Transport(String),
    /// Never completes.
    Hang,
}

impl MockResponse {
    /// Successful body from text.
    #[must_use]
    pub fn text(body: &str) -> Self {
        Self::Body(body.as_bytes().to_vec())
    }
}

/// What a [`MockTransport`] saw for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL.
    pub url: String,
    /// `Accept` header, if any.
    pub accept: Option<&'static str>,
    /// Whether a bearer token was attached.
    pub had_bearer: bool,
}

/// Scripted [`Transport`].
///
/// Replies are consumed in order; once the script runs out the fallback
/// reply is repeated. Clones share state.
#[derive(Debug, Clone)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    fallback: MockResponse,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    /// Transport that always answers `fallback`.
    #[must_use]
    pub fn new(fallback: MockResponse) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Transport that always returns `body`.
    #[must_use]
    pub fn serving(body: &str) -> Self {
        Self::new(MockResponse::text(body))
    }

    /// Transport that always fails with a 503.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(MockResponse::Status(503))
    }

    /// Queue replies ahead of the fallback.
    #[must_use]
    pub fn with_script(self, replies: impl IntoIterator<Item = MockResponse>) -> Self {
        lock(&self.script).extend(replies);
        self
    }

    /// Number of requests received.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &FetchRequest, progress: &dyn ProgressSink) -> FetchResult<Vec<u8>> {
        lock(&self.requests).push(RecordedRequest {
            url: request.url.to_string(),
            accept: request.accept,
            had_bearer: request.bearer.is_some(),
        });
        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            MockResponse::Body(body) => {
                progress.report(100.0, "mock body received");
                Ok(body)
            },
            MockResponse::Status(status) => Err(FetchError::Status {
                url: request.url.to_string(),
                status,
            }),
            MockResponse::Transport(message) => Err(FetchError::Transport {
                url: request.url.to_string(),
                message,
            }),
            MockResponse::Hang => std::future::pending().await,
        }
    }
}

/// Process handle whose liveness is controlled by the test.
#[derive(Debug)]
pub struct MockProcess {
    pid: u32,
    alive: Arc<AtomicBool>,
}

impl ProcessHandle for MockProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// [`ProcessSpawner`] that records requests and hands out [`MockProcess`]es.
#[derive(Debug, Clone, Default)]
pub struct MockSpawner {
    requests: Arc<Mutex<Vec<SpawnRequest>>>,
    processes: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    next_pid: Arc<AtomicU32>,
    refuse: bool,
}

impl MockSpawner {
    /// Spawner that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner whose every spawn fails with `PermissionDenied`.
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SpawnRequest> {
        lock(&self.requests).clone()
    }

    /// Number of processes spawned.
    #[must_use]
    pub fn spawned(&self) -> usize {
        lock(&self.processes).len()
    }

    /// Number of spawned processes still alive.
    #[must_use]
    pub fn alive(&self) -> usize {
        lock(&self.processes)
            .iter()
            .filter(|a| a.load(Ordering::SeqCst))
            .count()
    }

    /// Make every spawned process exit.
    pub fn exit_all(&self) {
        for alive in lock(&self.processes).iter() {
            alive.store(false, Ordering::SeqCst);
        }
    }
}

impl ProcessSpawner for MockSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn ProcessHandle>> {
        lock(&self.requests).push(request.clone());
        if self.refuse {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "spawn refused"));
        }
        let alive = Arc::new(AtomicBool::new(true));
        lock(&self.processes).push(Arc::clone(&alive));
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst).saturating_add(1000);
        Ok(Box::new(MockProcess { pid, alive }))
    }
}

/// In-memory [`PackageManager`].
#[derive(Debug, Clone, Default)]
pub struct MockPackageManager {
    installed: Arc<Mutex<HashSet<String>>>,
    broken: Arc<Mutex<HashSet<String>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockPackageManager {
    /// Manager with nothing installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark packages as already installed.
    #[must_use]
    pub fn with_installed(self, packages: &[&str]) -> Self {
        lock(&self.installed).extend(packages.iter().map(|p| (*p).to_owned()));
        self
    }

    /// Make installs of `package` fail.
    #[must_use]
    pub fn with_broken(self, package: &str) -> Self {
        lock(&self.broken).insert(package.to_owned());
        self
    }

    /// Operations performed, as `show <pkg>` / `install <pkg>`.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        lock(&self.log).clone()
    }
}

#[async_trait]
impl PackageManager for MockPackageManager {
    async fn is_installed(&self, package: &str) -> ProvisionResult<bool> {
        lock(&self.log).push(format!("show {package}"));
        Ok(lock(&self.installed).contains(package))
    }

    async fn install(&self, package: &str) -> ProvisionResult<()> {
        lock(&self.log).push(format!("install {package}"));
        if lock(&self.broken).contains(package) {
            return Err(ProvisionError::InstallFailed {
                package: package.to_owned(),
                code: Some(1),
                stderr: "mock install failure".to_owned(),
            });
        }
        lock(&self.installed).insert(package.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use runway_core::NoProgress;

    use super::*;

    fn request() -> FetchRequest {
        FetchRequest::new("https://example.com/a".parse().unwrap())
    }

    #[tokio::test]
    async fn test_script_then_fallback() {
        let t = MockTransport::serving("ok").with_script([MockResponse::Status(500)]);
        assert!(t.get(&request(), &NoProgress).await.is_err());
        assert_eq!(t.get(&request(), &NoProgress).await.unwrap(), b"ok");
        assert_eq!(t.calls(), 2);
    }

    #[test]
    fn test_spawner_tracks_liveness() {
        let s = MockSpawner::new();
        let mut h = s.spawn(&SpawnRequest::new("/bin/tool")).unwrap();
        assert_eq!(s.alive(), 1);
        h.terminate().unwrap();
        assert_eq!(s.alive(), 0);
        assert_eq!(s.spawned(), 1);
    }

    #[tokio::test]
    async fn test_package_manager_installs() {
        let pm = MockPackageManager::new().with_broken("bad");
        assert!(!pm.is_installed("x").await.unwrap());
        pm.install("x").await.unwrap();
        assert!(pm.is_installed("x").await.unwrap());
        assert!(pm.install("bad").await.is_err());
    }
}
