//! Best-effort recursive removal with statistics.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// A path that could not be removed.
#[derive(Debug, Clone)]
pub struct PruneFailure {
    /// The directory that survived.
    pub path: PathBuf,
    /// Why removal failed.
    pub error: String,
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Directories removed.
    pub removed: Vec<PathBuf>,
    /// Bytes held by the removed directories.
    pub bytes_reclaimed: u64,
    /// Directories that could not be removed.
    pub failures: Vec<PruneFailure>,
}

impl PruneReport {
    /// Whether nothing was removed and nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.failures.is_empty()
    }

    /// Remove `path`, recording the outcome.
    pub(crate) fn remove(&mut self, path: &Path) {
        let size = dir_size(path);
        match force_remove_dir(path) {
            Ok(()) => {
                debug!(path = %path.display(), bytes = size, "removed stale cache directory");
                self.removed.push(path.to_path_buf());
                self.bytes_reclaimed = self.bytes_reclaimed.saturating_add(size);
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove stale cache directory");
                self.failures.push(PruneFailure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            },
        }
    }
}

/// Total size of the regular files under `path`. Unreadable entries count
/// as zero.
#[must_use]
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .fold(0, u64::saturating_add)
}

/// Remove a directory tree, clearing read-only permissions and retrying
/// once if the first attempt is refused.
///
/// # Errors
///
/// Returns the error of the second attempt.
pub fn force_remove_dir(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "retrying removal after resetting permissions");
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                make_writable(entry.path(), entry.file_type().is_dir());
            }
            std::fs::remove_dir_all(path)
        },
    }
}

#[cfg(unix)]
fn make_writable(path: &Path, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;
    let mode = if is_dir { 0o700 } else { 0o600 };
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path, _is_dir: bool) {
    if let Ok(meta) = std::fs::metadata(path) {
        let mut perms = meta.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            let _ = std::fs::set_permissions(path, perms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_size_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b"), vec![0u8; 50]).unwrap();
        assert_eq!(dir_size(dir.path()), 150);
    }

    #[test]
    fn test_force_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(force_remove_dir(&dir.path().join("missing")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_force_remove_read_only_tree() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("stale");
        let inner = target.join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(inner.join("tool.bin"), b"x").unwrap();
        std::fs::set_permissions(&inner, std::fs::Permissions::from_mode(0o500)).unwrap();

        force_remove_dir(&target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_report_records_removal() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("old");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("f"), vec![1u8; 10]).unwrap();

        let mut report = PruneReport::default();
        report.remove(&target);

        assert_eq!(report.removed, vec![target.clone()]);
        assert_eq!(report.bytes_reclaimed, 10);
        assert!(report.failures.is_empty());
        assert!(!target.exists());
    }
}
