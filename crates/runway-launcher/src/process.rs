//! Spawning tool processes.
//!
//! Tools always run as independent OS processes. Every child carries
//! [`LAUNCH_MARKER_ENV`] so that a Runway binary started by a tool exits
//! immediately instead of initializing a second orchestrator.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

/// Environment variable set on every launched tool.
pub const LAUNCH_MARKER_ENV: &str = "RUNWAY_NESTED_LAUNCH";

/// Whether a marker value counts as set (`1`, `true`, `yes`, any case).
#[must_use]
pub fn marker_is_set(value: Option<&OsStr>) -> bool {
    value
        .and_then(OsStr::to_str)
        .map(str::trim)
        .is_some_and(|v| {
            v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
        })
}

/// Whether this process was started by a Runway launch.
#[must_use]
pub fn launched_by_runway() -> bool {
    marker_is_set(std::env::var_os(LAUNCH_MARKER_ENV).as_deref())
}

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Variables added to the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    /// Working directory.
    pub working_dir: Option<PathBuf>,
}

impl SpawnRequest {
    /// Request for `program` carrying the launch marker.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: vec![(LAUNCH_MARKER_ENV.into(), "1".into())],
            working_dir: None,
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// A running (or exited) child.
pub trait ProcessHandle: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Non-blocking liveness poll.
    fn is_alive(&mut self) -> bool;

    /// Stop the process and reap it.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be signalled.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Starts processes.
pub trait ProcessSpawner: Send + Sync {
    /// Start `request` as an independent process.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the process cannot be started.
    fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Spawner using `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSpawner;

impl ProcessSpawner for OsSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        detach(&mut cmd);

        let child = cmd.spawn()?;
        debug!(program = %request.program.display(), pid = child.id(), "spawned tool process");
        Ok(Box::new(OsProcess { child }))
    }
}

/// Tools get their own console on Windows.
#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    cmd.creation_flags(CREATE_NEW_CONSOLE);
}

/// Tool output is discarded outside Windows.
#[cfg(not(windows))]
fn detach(cmd: &mut Command) {
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
}

/// A child started by [`OsSpawner`].
#[derive(Debug)]
pub struct OsProcess {
    child: Child,
}

impl ProcessHandle for OsProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> io::Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => return Ok(()),
            Err(e) => return Err(e),
        }
        self.child.wait().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_truthy_values() {
        for v in ["1", "true", "TRUE", "Yes", " yes "] {
            assert!(marker_is_set(Some(OsStr::new(v))), "{v}");
        }
        for v in ["", "0", "false", "no", "2"] {
            assert!(!marker_is_set(Some(OsStr::new(v))), "{v}");
        }
        assert!(!marker_is_set(None));
    }

    #[test]
    fn test_request_carries_marker() {
        let req = SpawnRequest::new("/opt/tool").arg("--fast");
        assert!(
            req.env
                .iter()
                .any(|(k, v)| k == LAUNCH_MARKER_ENV && v == "1")
        );
        assert_eq!(req.args, vec![OsString::from("--fast")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_os_spawner_liveness_and_terminate() {
        let req = SpawnRequest::new("sleep").arg("30");
        let mut handle = OsSpawner.spawn(&req).unwrap();
        assert!(handle.id().is_some());
        assert!(handle.is_alive());
        handle.terminate().unwrap();
        assert!(!handle.is_alive());
    }
}
