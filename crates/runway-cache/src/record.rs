//! Side-channel record of the active cache location.
//!
//! Stored as JSON in the Runway state directory, independent of the cache
//! location itself, so a later run in the same epoch can find the directory
//! without probing candidates again.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use runway_core::MachineFingerprint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::epoch::CacheEpoch;
use crate::error::{CacheError, CacheResult};

/// Persisted cache location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Directory holding the cache for this epoch.
    pub cache_dir: PathBuf,
    /// Epoch the directory was created for.
    pub epoch: CacheEpoch,
    /// Fingerprint the directory belongs to.
    pub fingerprint: MachineFingerprint,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
}

impl LocationRecord {
    /// Read a record. Missing or malformed records read as `None`.
    #[must_use]
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring malformed location record");
                None
            },
        }
    }

    /// Whether the record points at a live directory for this fingerprint
    /// and epoch.
    #[must_use]
    pub fn is_usable_for(&self, fingerprint: &MachineFingerprint, epoch: CacheEpoch) -> bool {
        self.epoch == epoch && &self.fingerprint == fingerprint && self.cache_dir.is_dir()
    }

    /// Write the record atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| CacheError::Encode {
            path: path.to_path_buf(),
            source: e,
        })?;
        write_atomic(path, &json)
    }
}

/// Write `bytes` to a temporary file next to `path` and rename it over
/// `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| CacheError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| CacheError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}
