//! Startup sequence.
//!
//! Cache location -> optional pruning -> authorization asset -> gate ->
//! launcher. Nothing that can launch a tool exists until the gate has
//! admitted the device.

use std::sync::Arc;

use runway_cache::{ArtifactStore, CacheLocation, CacheStore, PruneReport, StoreOptions, TtlPolicy};
use runway_core::{MachineIdentity, ProgressSink};
use runway_fetch::Fetcher;
use tracing::{debug, warn};

use crate::assets::{AssetStatus, AssetSync};
use crate::catalog::Catalog;
use crate::error::BootstrapError;
use crate::gate::{AuthorizationMode, DeviceAuthorizationGate};
use crate::launcher::{Launcher, LauncherParts};
use crate::process::ProcessSpawner;
use crate::provision::DependencyProvisioner;

/// Inputs to [`bootstrap`].
pub struct BootstrapOptions {
    /// Cache placement options.
    pub store: StoreOptions,
    /// Remove directories from other epochs before starting.
    pub prune_on_start: bool,
    /// Configured tools and assets.
    pub catalog: Catalog,
    /// Freshness policy.
    pub policy: TtlPolicy,
    /// Artifact fetcher.
    pub fetcher: Fetcher,
    /// Dependency provisioner.
    pub provisioner: DependencyProvisioner,
    /// Process spawner.
    pub spawner: Arc<dyn ProcessSpawner>,
    /// Catalog id of the asset holding the device allow-list.
    pub authorization_asset: Option<String>,
}

impl std::fmt::Debug for BootstrapOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapOptions")
            .field("store", &self.store)
            .field("prune_on_start", &self.prune_on_start)
            .field("tools", &self.catalog.tool_count())
            .field("authorization_asset", &self.authorization_asset)
            .finish_non_exhaustive()
    }
}

/// A started, authorized runtime.
#[derive(Debug)]
pub struct Bootstrapped {
    /// Tool launcher.
    pub launcher: Launcher,
    /// Asset synchronizer over the same cache location.
    pub assets: AssetSync,
    /// Cache placement.
    pub store: CacheStore,
    /// Chosen cache directory.
    pub location: CacheLocation,
    /// Pruning result, if pruning ran.
    pub pruned: Option<PruneReport>,
    /// How the device was admitted.
    pub authorization: AuthorizationMode,
}

/// Run the startup sequence for `identity`.
///
/// # Errors
///
/// Returns [`BootstrapError::Cache`] if no cache directory can be created,
/// [`BootstrapError::Asset`] if a local allow-list exists but cannot be read,
/// and [`BootstrapError::Gate`] if the device is not authorized.
pub async fn bootstrap(
    identity: &MachineIdentity,
    options: BootstrapOptions,
    progress: &dyn ProgressSink,
) -> Result<Bootstrapped, BootstrapError> {
    let fingerprint = identity.fingerprint();
    let store = CacheStore::new(options.store);
    let location = store.locate_or_create(fingerprint)?;
    debug!(
        path = %location.path().display(),
        reused = location.was_reused(),
        "using cache location"
    );

    let pruned = options
        .prune_on_start
        .then(|| store.prune_stale(fingerprint, location.epoch()));

    let artifacts = ArtifactStore::new(location.path());
    let assets = AssetSync::new(options.fetcher.clone(), artifacts.clone(), options.policy);

    let allow_list = match options.authorization_asset.as_deref() {
        None => None,
        Some(id) => match options.catalog.asset(id) {
            Some(asset) => {
                let loaded = assets.load_text(asset, progress).await?;
                log_allow_list_source(id, &loaded.status);
                loaded.text
            },
            None => {
                warn!(asset = id, "authorization asset is not configured in the catalog");
                None
            },
        },
    };
    let authorized = DeviceAuthorizationGate::from_asset(allow_list.as_deref()).authorize(identity)?;

    let launcher = Launcher::new(
        authorized,
        LauncherParts {
            catalog: options.catalog,
            store: artifacts,
            policy: options.policy,
            fetcher: options.fetcher,
            provisioner: options.provisioner,
            spawner: options.spawner,
        },
    );

    Ok(Bootstrapped {
        launcher,
        assets,
        store,
        location,
        pruned,
        authorization: authorized.mode(),
    })
}

fn log_allow_list_source(id: &str, status: &AssetStatus) {
    match status {
        AssetStatus::Fresh | AssetStatus::Fetched => {
            debug!(asset = id, ?status, "allow-list is current");
        },
        AssetStatus::FallbackCached { error } => {
            warn!(asset = id, %error, "authorizing against a stale cached allow-list");
        },
        AssetStatus::FallbackBundled { error } => {
            warn!(asset = id, %error, "authorizing against the bundled allow-list");
        },
        AssetStatus::Unavailable { error } => {
            warn!(asset = id, %error, "no copy of the allow-list is available");
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use async_trait::async_trait;
    use runway_core::{IdentitySource, NoProgress, RetryConfig};
    use runway_fetch::{Endpoints, FetchError, FetchRequest, FetchResult, SourceLocator, Transport};

    use super::*;
    use crate::catalog::AssetSpec;
    use crate::error::{GateError, ProvisionResult};
    use crate::process::{ProcessHandle, SpawnRequest};
    use crate::provision::PackageManager;

    const ME: &str = "4c4c4544-0042-3510-8052-b4c04f4d4e31";

    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn get(&self, request: &FetchRequest, _p: &dyn ProgressSink) -> FetchResult<Vec<u8>> {
            Err(FetchError::Transport {
                url: request.url.to_string(),
                message: "offline".into(),
            })
        }
    }

    struct Ready;

    #[async_trait]
    impl PackageManager for Ready {
        async fn is_installed(&self, _package: &str) -> ProvisionResult<bool> {
            Ok(true)
        }

        async fn install(&self, _package: &str) -> ProvisionResult<()> {
            Ok(())
        }
    }

    struct NoSpawn;

    impl ProcessSpawner for NoSpawn {
        fn spawn(&self, _request: &SpawnRequest) -> io::Result<Box<dyn ProcessHandle>> {
            Err(io::Error::other("spawning disabled"))
        }
    }

    fn options(dir: &Path, bundled_list: Option<&str>) -> BootstrapOptions {
        let mut assets = Vec::new();
        let mut authorization_asset = None;
        if let Some(text) = bundled_list {
            let bundled = dir.join("bundled-devices.txt");
            std::fs::write(&bundled, text).unwrap();
            assets.push(AssetSpec {
                id: "devices".into(),
                source: SourceLocator::repo("acme", "web", "devices.txt").unwrap(),
                file_name: "devices.txt".into(),
                bundled: Some(bundled),
            });
            authorization_asset = Some("devices".to_owned());
        }
        let mut store = StoreOptions::new(dir.join("state"), vec![dir.join("base")]);
        store.base_dirs.truncate(1);
        BootstrapOptions {
            store: store.with_hide(false),
            prune_on_start: true,
            catalog: Catalog::new(Vec::new(), assets),
            policy: TtlPolicy::default(),
            fetcher: Fetcher::new(Arc::new(Offline), Endpoints::public().unwrap())
                .with_retry(RetryConfig::no_retry()),
            provisioner: DependencyProvisioner::new(Arc::new(Ready)),
            spawner: Arc::new(NoSpawn),
            authorization_asset,
        }
    }

    fn me() -> MachineIdentity {
        MachineIdentity::from_raw(ME, IdentitySource::Platform("test"))
    }

    #[tokio::test]
    async fn test_open_without_authorization_asset() {
        let dir = tempfile::tempdir().unwrap();
        let started = bootstrap(&me(), options(dir.path(), None), &NoProgress)
            .await
            .unwrap();
        assert_eq!(started.authorization, AuthorizationMode::NoAsset);
        assert!(started.location.path().starts_with(dir.path().join("base")));
        assert!(started.pruned.is_some());
    }

    #[tokio::test]
    async fn test_bundled_list_admits_listed_device() {
        let dir = tempfile::tempdir().unwrap();
        let list = format!("window.DEVICES = [\"{}\"];", ME.to_uppercase());
        let started = bootstrap(&me(), options(dir.path(), Some(&list)), &NoProgress)
            .await
            .unwrap();
        assert_eq!(started.authorization, AuthorizationMode::Listed { entries: 1 });
        assert_eq!(started.launcher.authorization(), started.authorization);
    }

    #[tokio::test]
    async fn test_unlisted_device_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let list = "allowed: 00000000-0000-0000-0000-000000000001";
        let err = bootstrap(&me(), options(dir.path(), Some(list)), &NoProgress)
            .await
            .unwrap_err();
        let BootstrapError::Gate(GateError::Denied { device_id, .. }) = err else {
            panic!("expected denial, got {err:?}");
        };
        assert_eq!(device_id, ME);
    }

    #[tokio::test]
    async fn test_non_utf8_list_still_denies_unlisted_device() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("devices.js");
        std::fs::write(
            &bundled,
            b"// caf\xe9 office\n[\"0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0\"]",
        )
        .unwrap();
        let mut opts = options(dir.path(), Some("placeholder"));
        opts.catalog = Catalog::new(
            Vec::new(),
            vec![AssetSpec {
                id: "devices".into(),
                source: SourceLocator::repo("acme", "web", "devices.js").unwrap(),
                file_name: "devices.js".into(),
                bundled: Some(bundled),
            }],
        );

        let err = bootstrap(&me(), opts, &NoProgress).await.unwrap_err();
        assert!(matches!(err, BootstrapError::Gate(GateError::Denied { .. })));
    }

    #[tokio::test]
    async fn test_empty_list_is_open() {
        let dir = tempfile::tempdir().unwrap();
        let started = bootstrap(&me(), options(dir.path(), Some("// no devices yet")), &NoProgress)
            .await
            .unwrap();
        assert_eq!(started.authorization, AuthorizationMode::NotConfigured);
    }
}
