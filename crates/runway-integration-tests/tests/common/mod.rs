//! Shared harness for integration tests.

use std::sync::Arc;

use runway_cache::{StoreOptions, TtlPolicy};
use runway_core::RetryConfig;
use runway_fetch::{Endpoints, Fetcher};
use runway_launcher::{BootstrapOptions, Catalog, DependencyProvisioner};
use runway_test::{MockPackageManager, MockSpawner, MockTransport, TestContext, init_test_logging};

/// Mocks plus a temporary layout, wired the way the binary wires the real
/// implementations.
#[allow(dead_code)]
pub struct Harness {
    /// Temporary directories.
    pub ctx: TestContext,
    /// Scripted transport.
    pub transport: MockTransport,
    /// Recording spawner.
    pub spawner: MockSpawner,
    /// In-memory package manager.
    pub packages: MockPackageManager,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(transport: MockTransport) -> Self {
        init_test_logging("runway=debug");
        Self {
            ctx: TestContext::new(),
            transport,
            spawner: MockSpawner::new(),
            packages: MockPackageManager::new(),
        }
    }

    pub fn with_packages(mut self, packages: MockPackageManager) -> Self {
        self.packages = packages;
        self
    }

    /// Fetcher over the mock transport with the given retry policy.
    pub fn fetcher(&self, retry: RetryConfig) -> Fetcher {
        Fetcher::new(
            Arc::new(self.transport.clone()),
            Endpoints::public().expect("default endpoints"),
        )
        .with_retry(retry)
    }

    /// Store options restricted to the harness cache base.
    pub fn store_options(&self) -> StoreOptions {
        let mut options = StoreOptions::new(self.ctx.state_dir(), vec![self.ctx.cache_base()]);
        options.base_dirs.truncate(1);
        options.with_hide(false)
    }

    pub fn bootstrap_options(&self, catalog: Catalog, authorization_asset: Option<&str>) -> BootstrapOptions {
        BootstrapOptions {
            store: self.store_options(),
            prune_on_start: true,
            catalog,
            policy: TtlPolicy::default(),
            fetcher: self.fetcher(RetryConfig::no_retry()),
            provisioner: DependencyProvisioner::new(Arc::new(self.packages.clone())),
            spawner: Arc::new(self.spawner.clone()),
            authorization_asset: authorization_asset.map(str::to_owned),
        }
    }
}
