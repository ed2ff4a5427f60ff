//! Interface asset synchronization.
//!
//! An asset is refetched only when its cached copy is no longer valid. When
//! fetching fails the existing cached copy is kept, and if there is none the
//! bundled copy is copied into the cache.

use std::path::PathBuf;

use runway_cache::{ArtifactKind, ArtifactStore, TtlPolicy};
use runway_core::ProgressSink;
use runway_fetch::{ArtifactTarget, Fetcher};
use tracing::{debug, warn};

use crate::catalog::AssetSpec;
use crate::error::AssetReadError;

/// What happened to one asset during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    /// The cached copy was still valid.
    Fresh,
    /// A new copy was downloaded.
    Fetched,
    /// Download failed; the previous cached copy is used.
    FallbackCached {
        /// Download error.
        error: String,
    },
    /// Download failed; the bundled copy was installed.
    FallbackBundled {
        /// Download error.
        error: String,
    },
    /// Download failed and no local copy exists.
    Unavailable {
        /// Download error.
        error: String,
    },
}

impl AssetStatus {
    /// Whether a usable copy exists after the sync.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Unavailable { .. })
    }
}

/// Result of [`AssetSync::load_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAsset {
    /// How the sync went.
    pub status: AssetStatus,
    /// Text of the best local copy; `None` only when no copy exists.
    /// Bytes that are not UTF-8 are replaced, never rejected.
    pub text: Option<String>,
}

/// Keeps interface assets in the cache up to date.
#[derive(Debug, Clone)]
pub struct AssetSync {
    fetcher: Fetcher,
    store: ArtifactStore,
    policy: TtlPolicy,
}

impl AssetSync {
    /// Sync assets into `store` using `fetcher`.
    #[must_use]
    pub fn new(fetcher: Fetcher, store: ArtifactStore, policy: TtlPolicy) -> Self {
        Self {
            fetcher,
            store,
            policy,
        }
    }

    /// Path of the cached copy.
    #[must_use]
    pub fn cached_path(&self, asset: &AssetSpec) -> PathBuf {
        self.store.content_path(ArtifactKind::Asset, &asset.id, &asset.file_name)
    }

    /// Best local copy: cached first, bundled otherwise.
    #[must_use]
    pub fn locate(&self, asset: &AssetSpec) -> Option<PathBuf> {
        let cached = self.cached_path(asset);
        if cached.is_file() {
            return Some(cached);
        }
        asset.bundled.clone().filter(|p| p.is_file())
    }

    /// Whether the cached copy is still valid.
    #[must_use]
    pub fn is_fresh(&self, asset: &AssetSpec) -> bool {
        let meta = self.store.read_meta(ArtifactKind::Asset, &asset.id);
        self.policy.is_valid(meta.as_ref(), ArtifactKind::Asset)
    }

    /// Bring one asset up to date.
    pub async fn sync(&self, asset: &AssetSpec, progress: &dyn ProgressSink) -> AssetStatus {
        if self.is_fresh(asset) {
            debug!(asset = %asset.id, "asset cache is fresh");
            return AssetStatus::Fresh;
        }

        let target = ArtifactTarget {
            id: &asset.id,
            kind: ArtifactKind::Asset,
            file_name: &asset.file_name,
        };
        let error = match self
            .fetcher
            .fetch_artifact(&self.store, target, &asset.source, progress)
            .await
        {
            Ok(_) => return AssetStatus::Fetched,
            Err(e) => e.to_string(),
        };

        warn!(asset = %asset.id, error = %error, "asset download failed, falling back to local copy");
        let cached = self.cached_path(asset);
        if cached.is_file() {
            return AssetStatus::FallbackCached { error };
        }
        if let Some(bundled) = asset.bundled.as_ref().filter(|p| p.is_file()) {
            let copied = cached
                .parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|()| std::fs::copy(bundled, &cached));
            if let Err(e) = copied {
                warn!(asset = %asset.id, error = %e, "failed to copy bundled asset into cache");
            }
            return AssetStatus::FallbackBundled { error };
        }
        AssetStatus::Unavailable { error }
    }

    /// Sync every asset in order.
    pub async fn sync_all<'a>(
        &self,
        assets: impl IntoIterator<Item = &'a AssetSpec>,
        progress: &dyn ProgressSink,
    ) -> Vec<(String, AssetStatus)> {
        let mut results = Vec::new();
        for asset in assets {
            let status = self.sync(asset, progress).await;
            results.push((asset.id.clone(), status));
        }
        results
    }

    /// Sync `asset` and read the best local copy as text.
    ///
    /// # Errors
    ///
    /// Returns [`AssetReadError`] if a local copy exists but cannot be read.
    pub async fn load_text(
        &self,
        asset: &AssetSpec,
        progress: &dyn ProgressSink,
    ) -> Result<LoadedAsset, AssetReadError> {
        let status = self.sync(asset, progress).await;
        let Some(path) = self.locate(asset) else {
            return Ok(LoadedAsset { status, text: None });
        };
        let bytes = std::fs::read(&path).map_err(|source| AssetReadError { path, source })?;
        Ok(LoadedAsset {
            status,
            text: Some(String::from_utf8_lossy(&bytes).into_owned()),
        })
    }
}
