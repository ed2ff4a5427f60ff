//! Cache placement and rotation.
//!
//! [`CacheStore`] picks the cache directory for a fingerprint and epoch from
//! an ordered arena of candidate base directories (first writable wins),
//! remembers the choice in a [`LocationRecord`], and prunes directories left
//! over from other epochs.

use std::path::{Path, PathBuf};

use chrono::Utc;
use runway_core::MachineFingerprint;
use tracing::{debug, info, warn};

use crate::epoch::CacheEpoch;
use crate::error::{CacheError, CacheResult};
use crate::hide;
use crate::naming::NamingProfile;
use crate::prune::PruneReport;
use crate::record::LocationRecord;

const WRITE_CHECK_FILE: &str = ".runway-write-check";

/// Options for a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Naming profile for cache directories.
    pub naming: NamingProfile,
    /// Candidate base directories, tried in order.
    pub base_dirs: Vec<PathBuf>,
    /// Directory holding location records.
    pub record_dir: PathBuf,
    /// Apply hidden attributes after creation.
    pub hide: bool,
}

impl StoreOptions {
    /// Options with the given record directory, configured base directories
    /// first and the platform defaults after them.
    #[must_use]
    pub fn new(record_dir: impl Into<PathBuf>, configured: Vec<PathBuf>) -> Self {
        let mut base_dirs = configured;
        for d in default_base_dirs() {
            if !base_dirs.contains(&d) {
                base_dirs.push(d);
            }
        }
        Self {
            naming: NamingProfile::default(),
            base_dirs,
            record_dir: record_dir.into(),
            hide: true,
        }
    }

    /// Set the naming profile.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingProfile) -> Self {
        self.naming = naming;
        self
    }

    /// Enable or disable hidden attributes.
    #[must_use]
    pub fn with_hide(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }
}

/// Per-user platform locations, the user cache directory last.
#[must_use]
pub fn default_base_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.data_local_dir().join("runway"));
        dirs.push(base.cache_dir().join("runway"));
    }
    dirs.push(std::env::temp_dir().join("runway"));
    dirs
}

/// The chosen cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    path: PathBuf,
    epoch: CacheEpoch,
    reused: bool,
}

impl CacheLocation {
    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Epoch the directory belongs to.
    #[must_use]
    pub fn epoch(&self) -> CacheEpoch {
        self.epoch
    }

    /// Whether the directory came from the location record rather than a
    /// fresh write check.
    #[must_use]
    pub fn was_reused(&self) -> bool {
        self.reused
    }
}

/// Cache placement, rotation and pruning.
#[derive(Debug, Clone)]
pub struct CacheStore {
    options: StoreOptions,
}

impl CacheStore {
    /// Create a store.
    #[must_use]
    pub fn new(options: StoreOptions) -> Self {
        Self { options }
    }

    /// Candidate base directories in search order.
    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        &self.options.base_dirs
    }

    /// Naming profile in use.
    #[must_use]
    pub fn naming(&self) -> NamingProfile {
        self.options.naming
    }

    /// Path of the location record for `fingerprint`.
    #[must_use]
    pub fn record_path(&self, fingerprint: &MachineFingerprint) -> PathBuf {
        self.options
            .record_dir
            .join(format!("cache-location-{fingerprint}.json"))
    }

    /// Find or create the cache directory for the current epoch.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoWritableLocation`] if no candidate is usable.
    pub fn locate_or_create(&self, fingerprint: &MachineFingerprint) -> CacheResult<CacheLocation> {
        self.locate_or_create_at(fingerprint, CacheEpoch::current())
    }

    /// Find or create the cache directory for `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoWritableLocation`] if no candidate is usable.
    pub fn locate_or_create_at(
        &self,
        fingerprint: &MachineFingerprint,
        epoch: CacheEpoch,
    ) -> CacheResult<CacheLocation> {
        let record_path = self.record_path(fingerprint);
        if let Some(record) = LocationRecord::load(&record_path)
            && record.is_usable_for(fingerprint, epoch)
        {
            debug!(path = %record.cache_dir.display(), %epoch, "reusing recorded cache location");
            return Ok(CacheLocation {
                path: record.cache_dir,
                epoch,
                reused: true,
            });
        }

        if let Some(path) = self.find_current(fingerprint, epoch) {
            debug!(path = %path.display(), %epoch, "adopting existing cache directory");
            self.save_record(&record_path, &path, fingerprint, epoch);
            return Ok(CacheLocation {
                path,
                epoch,
                reused: true,
            });
        }

        let name = self.options.naming.dir_name(fingerprint, epoch);
        let mut tried = Vec::with_capacity(self.options.base_dirs.len());

        for base in &self.options.base_dirs {
            let path = base.join(&name);
            if let Err(e) = create_and_check(&path) {
                debug!(path = %path.display(), error = %e, "cache candidate rejected");
                tried.push(base.clone());
                continue;
            }

            if self.options.hide {
                hide::hide(&path);
            }

            self.save_record(&record_path, &path, fingerprint, epoch);
            info!(path = %path.display(), %epoch, "cache location ready");
            return Ok(CacheLocation {
                path,
                epoch,
                reused: false,
            });
        }

        Err(CacheError::NoWritableLocation { tried })
    }

    /// First writable directory of ours for `epoch` already present in a
    /// candidate base, for when the record is missing or unreadable.
    fn find_current(&self, fingerprint: &MachineFingerprint, epoch: CacheEpoch) -> Option<PathBuf> {
        let naming = self.options.naming;
        self.options.base_dirs.iter().find_map(|base| {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(base)
                .ok()?
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|name| naming.is_current(name, fingerprint, epoch))
                })
                .map(|e| e.path())
                .collect();
            entries.sort();
            entries.into_iter().find(|path| create_and_check(path).is_ok())
        })
    }

    fn save_record(
        &self,
        record_path: &Path,
        path: &Path,
        fingerprint: &MachineFingerprint,
        epoch: CacheEpoch,
    ) {
        let record = LocationRecord {
            cache_dir: path.to_path_buf(),
            epoch,
            fingerprint: fingerprint.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = record.save(record_path) {
            warn!(error = %e, "could not persist cache location record");
        }
    }

    /// Remove every directory of ours that belongs to an epoch other than
    /// `current`. Never fails; problems are collected in the report.
    pub fn prune_stale(&self, fingerprint: &MachineFingerprint, current: CacheEpoch) -> PruneReport {
        let mut report = PruneReport::default();
        let naming = self.options.naming;

        for base in &self.options.base_dirs {
            let entries = match std::fs::read_dir(base) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(base = %base.display(), error = %e, "skipping unreadable cache base");
                    continue;
                },
            };
            for entry in entries.filter_map(Result::ok) {
                let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if is_dir && naming.is_stale(name, fingerprint, current) {
                    report.remove(&entry.path());
                }
            }
        }

        // A record may point outside the current candidates if the base
        // directories were reconfigured.
        let record_path = self.record_path(fingerprint);
        if let Some(record) = LocationRecord::load(&record_path)
            && record.epoch != current
        {
            if record.cache_dir.is_dir() && !report.removed.contains(&record.cache_dir) {
                report.remove(&record.cache_dir);
            }
            if let Err(e) = std::fs::remove_file(&record_path) {
                debug!(path = %record_path.display(), error = %e, "could not remove stale record");
            }
        }

        if !report.is_empty() {
            info!(
                removed = report.removed.len(),
                bytes = report.bytes_reclaimed,
                failures = report.failures.len(),
                "pruned stale cache directories"
            );
        }
        report
    }

    /// Remove the current epoch's cache directory and its record.
    pub fn clear(&self, fingerprint: &MachineFingerprint, current: CacheEpoch) -> PruneReport {
        let mut report = PruneReport::default();
        let record_path = self.record_path(fingerprint);

        if let Some(record) = LocationRecord::load(&record_path)
            && record.cache_dir.is_dir()
        {
            report.remove(&record.cache_dir);
        }
        for base in &self.options.base_dirs {
            let Ok(entries) = std::fs::read_dir(base) else {
                continue;
            };
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                let path = entry.path();
                if self.options.naming.is_current(name, fingerprint, current)
                    && path.is_dir()
                    && !report.removed.contains(&path)
                {
                    report.remove(&path);
                }
            }
        }
        let _ = std::fs::remove_file(&record_path);
        report
    }
}

/// Create `path` and check it accepts writes.
fn create_and_check(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)?;
    let marker = path.join(WRITE_CHECK_FILE);
    std::fs::write(&marker, b"ok")?;
    std::fs::remove_file(&marker)
}
