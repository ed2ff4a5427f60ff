//! Cached artifacts and their metadata sidecars.
//!
//! Layout inside a cache location:
//!
//! ```text
//! <cache>/
//! ├── tools/<id>/<file>       (tool artifacts)
//! ├── web/<id>/<file>         (interface assets)
//! └── .meta/<kind>-<id>.json  (one sidecar per artifact)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::record::write_atomic;

/// Validity class of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Executable tool or script.
    Tool,
    /// Interface asset (including the authorization asset).
    Asset,
}

impl ArtifactKind {
    /// Content sub-directory for this kind.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Tool => "tools",
            Self::Asset => "web",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => f.write_str("tool"),
            Self::Asset => f.write_str("asset"),
        }
    }
}

/// Metadata for one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Tool or asset id.
    pub id: String,
    /// Validity class.
    pub kind: ArtifactKind,
    /// Local file path.
    pub path: PathBuf,
    /// When the content was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
    /// Human-readable source locator.
    pub source: String,
}

/// Artifact bookkeeping inside one cache location.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at a cache location.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache location root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the content of an artifact lives.
    ///
    /// Each id gets its own directory, so two artifacts sharing a file name
    /// never overwrite each other.
    #[must_use]
    pub fn content_path(&self, kind: ArtifactKind, id: &str, file_name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(id).join(file_name)
    }

    fn meta_dir(&self) -> PathBuf {
        self.root.join(".meta")
    }

    /// Where the metadata sidecar of an artifact lives.
    #[must_use]
    pub fn meta_path(&self, kind: ArtifactKind, id: &str) -> PathBuf {
        self.meta_dir().join(format!("{kind}-{id}.json"))
    }

    /// Read an artifact's metadata. Missing or malformed sidecars read as
    /// `None`.
    #[must_use]
    pub fn read_meta(&self, kind: ArtifactKind, id: &str) -> Option<ArtifactMeta> {
        let path = self.meta_path(kind, id);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content)
            .inspect_err(|e| debug!(path = %path.display(), error = %e, "ignoring malformed sidecar"))
            .ok()
    }

    /// Record metadata for freshly written content.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar cannot be written.
    pub fn record(&self, meta: &ArtifactMeta) -> CacheResult<()> {
        let path = self.meta_path(meta.kind, &meta.id);
        let json = serde_json::to_vec_pretty(meta).map_err(|e| CacheError::Encode {
            path: path.clone(),
            source: e,
        })?;
        write_atomic(&path, &json)
    }

    /// Every recorded artifact of `kind`.
    #[must_use]
    pub fn list(&self, kind: ArtifactKind) -> Vec<ArtifactMeta> {
        let prefix = format!("{kind}-");
        let Ok(entries) = std::fs::read_dir(self.meta_dir()) else {
            return Vec::new();
        };
        let mut metas: Vec<ArtifactMeta> = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                let id = name.strip_prefix(&prefix)?.strip_suffix(".json")?.to_owned();
                self.read_meta(kind, &id)
            })
            .collect();
        metas.sort_by(|a, b| a.id.cmp(&b.id));
        metas
    }

    /// Remove every artifact of `kind` (content and metadata), forcing the
    /// next access to refetch. Returns how many sidecars were removed.
    ///
    /// # Errors
    ///
    /// Returns the first removal error other than "not found".
    pub fn invalidate(&self, kind: ArtifactKind) -> CacheResult<usize> {
        let mut removed: usize = 0;
        for meta in self.list(kind) {
            remove_if_present(&meta.path)?;
            remove_if_present(&self.meta_path(kind, &meta.id))?;
            removed = removed.saturating_add(1);
        }
        debug!(%kind, removed, "invalidated cached artifacts");
        Ok(removed)
    }
}

fn remove_if_present(path: &Path) -> CacheResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(store: &ArtifactStore, kind: ArtifactKind, id: &str) -> ArtifactMeta {
        let path = store.content_path(kind, id, &format!("{id}.bin"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"payload").unwrap();
        ArtifactMeta {
            id: id.to_owned(),
            kind,
            path,
            fetched_at: Utc::now(),
            size: 7,
            source: "acme/tools/bin".to_owned(),
        }
    }

    #[test]
    fn test_layout() {
        let store = ArtifactStore::new("/cache/.abc");
        assert_eq!(
            store.content_path(ArtifactKind::Tool, "merger", "merge.py"),
            PathBuf::from("/cache/.abc/tools/merger/merge.py")
        );
        assert_eq!(
            store.content_path(ArtifactKind::Asset, "ui", "config.js"),
            PathBuf::from("/cache/.abc/web/ui/config.js")
        );
        assert_eq!(
            store.meta_path(ArtifactKind::Tool, "merger"),
            PathBuf::from("/cache/.abc/.meta/tool-merger.json")
        );
    }

    #[test]
    fn test_shared_file_name_stays_separate() {
        let store = ArtifactStore::new("/cache/.abc");
        assert_ne!(
            store.content_path(ArtifactKind::Tool, "alpha", "main.py"),
            store.content_path(ArtifactKind::Tool, "beta", "main.py")
        );
    }

    #[test]
    fn test_record_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let m = meta(&store, ArtifactKind::Tool, "merger");

        store.record(&m).unwrap();
        assert_eq!(store.read_meta(ArtifactKind::Tool, "merger"), Some(m));
        assert!(store.read_meta(ArtifactKind::Asset, "merger").is_none());
    }

    #[test]
    fn test_invalidate_only_touches_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let tool = meta(&store, ArtifactKind::Tool, "merger");
        let asset = meta(&store, ArtifactKind::Asset, "config");
        store.record(&tool).unwrap();
        store.record(&asset).unwrap();

        assert_eq!(store.invalidate(ArtifactKind::Tool).unwrap(), 1);

        assert!(!tool.path.exists());
        assert!(store.read_meta(ArtifactKind::Tool, "merger").is_none());
        assert!(asset.path.exists());
        assert_eq!(store.list(ArtifactKind::Asset).len(), 1);
    }

    #[test]
    fn test_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        for id in ["zeta", "alpha", "mid"] {
            store.record(&meta(&store, ArtifactKind::Tool, id)).unwrap();
        }
        let ids: Vec<String> = store
            .list(ArtifactKind::Tool)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }
}
