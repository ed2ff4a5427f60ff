//! Directory scaffolding for the Runway home directory.
//!
//! [`RunwayHome`] holds everything Runway keeps outside the rotating cache:
//! the user config file, log files, the side-channel cache location records,
//! and the persisted fallback machine identity.
//!
//! # Layout
//!
//! ```text
//! ~/.runway/                      (RunwayHome, or $RUNWAY_HOME)
//! ├── config.toml                   (user config layer)
//! ├── logs/                         (rolling log files)
//! ├── state/                        (cache location records, one per fingerprint)
//! └── identity/
//!     └── fallback-id               (random identity, only when no host id exists)
//! ```
//!
//! The cache itself does not live here. Its placement is decided by the
//! cache store from an ordered list of candidate base directories.

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory location.
pub const RUNWAY_HOME_ENV: &str = "RUNWAY_HOME";

/// Global Runway home directory (`~/.runway/` or `$RUNWAY_HOME`).
#[derive(Debug, Clone)]
pub struct RunwayHome {
    root: PathBuf,
}

impl RunwayHome {
    /// Resolve the home directory.
    ///
    /// Checks `$RUNWAY_HOME` first, then falls back to `<home>/.runway/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$RUNWAY_HOME` is relative, or if no home
    /// directory can be determined for the current user.
    pub fn resolve() -> io::Result<Self> {
        Self::resolve_from(std::env::var_os(RUNWAY_HOME_ENV).map(PathBuf::from))
    }

    /// Resolve from an explicit override value (the content of
    /// `$RUNWAY_HOME`, if any).
    ///
    /// # Errors
    ///
    /// Same as [`RunwayHome::resolve`].
    pub fn resolve_from(custom: Option<PathBuf>) -> io::Result<Self> {
        let root = if let Some(p) = custom {
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "RUNWAY_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let base = directories::BaseDirs::new().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "could not determine the home directory of the current user",
                )
            })?;
            base.home_dir().join(".runway")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists.
    ///
    /// Creates `logs/`, `state/` and `identity/`. On Unix the state and
    /// identity directories are restricted to the owner (`0o700`).
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.state_dir())?;
        std::fs::create_dir_all(self.identity_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.state_dir(), perms.clone())?;
            std::fs::set_permissions(self.identity_dir(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the user configuration file (`~/.runway/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Logs directory (`~/.runway/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// State directory holding cache location records (`~/.runway/state/`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Identity directory (`~/.runway/identity/`).
    #[must_use]
    pub fn identity_dir(&self) -> PathBuf {
        self.root.join("identity")
    }

    /// Path of the persisted random identity used when the host exposes
    /// no stable identifier.
    #[must_use]
    pub fn fallback_identity_path(&self) -> PathBuf {
        self.identity_dir().join("fallback-id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runway_home_resolve_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let home = RunwayHome::resolve_from(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(home.root(), dir.path());
    }

    #[test]
    fn test_runway_home_rejects_relative_override() {
        let err = RunwayHome::resolve_from(Some(PathBuf::from("relative/home"))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_runway_home_default_ends_with_dot_runway() {
        let home = RunwayHome::resolve_from(None).unwrap();
        assert!(home.root().ends_with(".runway"));
    }

    #[test]
    fn test_runway_home_ensure_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let home = RunwayHome::from_path(dir.path());
        home.ensure().unwrap();

        assert!(home.logs_dir().is_dir());
        assert!(home.state_dir().is_dir());
        assert!(home.identity_dir().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_runway_home_ensure_restricts_state_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let home = RunwayHome::from_path(dir.path());
        home.ensure().unwrap();

        let perms = std::fs::metadata(home.state_dir()).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o700);
    }

    #[test]
    fn test_paths_are_under_root() {
        let home = RunwayHome::from_path("/tmp/runway-home");
        assert_eq!(home.config_path(), PathBuf::from("/tmp/runway-home/config.toml"));
        assert_eq!(
            home.fallback_identity_path(),
            PathBuf::from("/tmp/runway-home/identity/fallback-id")
        );
    }
}
