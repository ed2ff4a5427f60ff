//! Test harness helpers.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::with_prefix("runway-test-").expect("Failed to create temp directory")
}

/// Create a file within a temporary directory, including parents.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file_in_dir(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write file");
    path
}

/// Set up test logging with the given filter. Later calls are no-ops.
pub fn init_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Temporary Runway layout: a home directory for state and a base
/// directory for cache placement.
#[derive(Debug)]
pub struct TestContext {
    /// Root of the layout.
    pub dir: TempDir,
}

impl TestContext {
    /// Create a new test context.
    #[must_use]
    pub fn new() -> Self {
        Self { dir: test_dir() }
    }

    /// Root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for location records and other state.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("home").join("state")
    }

    /// Single candidate base directory for cache placement.
    #[must_use]
    pub fn cache_base(&self) -> PathBuf {
        self.dir.path().join("cache-base")
    }

    /// Create a file in the test directory.
    #[must_use]
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        test_file_in_dir(self.dir.path(), name, content)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_layout() {
        let ctx = TestContext::new();
        let file = ctx.create_file("bundled/devices.js", "x");
        assert!(file.is_file());
        assert!(ctx.state_dir().starts_with(ctx.path()));
        assert_ne!(ctx.state_dir(), ctx.cache_base());
    }
}
