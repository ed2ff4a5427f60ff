//! Integration tests for cache rotation, validity and identity stability.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use runway_cache::{
    ArtifactKind, ArtifactMeta, ArtifactStore, CacheEpoch, CacheStore, NamingProfile, StoreOptions, TtlPolicy,
};
use runway_core::{IdentitySource, MachineIdentity, NoProgress};
use runway_fetch::{ArtifactTarget, Endpoints, Fetcher, SourceLocator};
use runway_test::{MockTransport, TestContext, test_identity};

fn store(ctx: &TestContext, naming: NamingProfile) -> CacheStore {
    let mut options = StoreOptions::new(ctx.state_dir(), vec![ctx.cache_base()]).with_naming(naming);
    options.base_dirs.truncate(1);
    CacheStore::new(options.with_hide(false))
}

fn prune_keeps_only_current_week(naming: NamingProfile) {
    let ctx = TestContext::new();
    let store = store(&ctx, naming);
    let fp = test_identity().fingerprint().clone();
    let w10 = CacheEpoch::new(2025, 10).unwrap();
    let w11 = CacheEpoch::new(2025, 11).unwrap();

    let old = store.locate_or_create_at(&fp, w10).unwrap();
    std::fs::write(old.path().join("tool.bin"), vec![0u8; 2048]).unwrap();
    let current = store.locate_or_create_at(&fp, w11).unwrap();

    let report = store.prune_stale(&fp, w11);
    assert_eq!(report.removed, vec![old.path().to_path_buf()]);
    assert!(report.bytes_reclaimed >= 2048);
    assert!(report.failures.is_empty());
    assert!(!old.path().exists());
    assert!(current.path().is_dir());
}

#[test]
fn prune_removes_previous_week_hashed() {
    prune_keeps_only_current_week(NamingProfile::Hashed);
}

#[test]
fn prune_removes_previous_week_labeled() {
    prune_keeps_only_current_week(NamingProfile::Labeled);
}

#[test]
fn validity_boundary_is_strict() {
    let ctx = TestContext::new();
    let path = ctx.create_file("tools/a.sh", "x");
    let policy = TtlPolicy::default();
    let ttl = policy.ttl(ArtifactKind::Tool);
    let now = Utc::now();
    let meta = |age: TimeDelta| ArtifactMeta {
        id: "a".into(),
        kind: ArtifactKind::Tool,
        path: path.clone(),
        fetched_at: now - age,
        size: 1,
        source: "acme/tools/a.sh".into(),
    };

    assert!(policy.is_valid_at(Some(&meta(ttl - TimeDelta::seconds(1))), ArtifactKind::Tool, now));
    assert!(!policy.is_valid_at(Some(&meta(ttl)), ArtifactKind::Tool, now));
    assert!(!policy.is_valid_at(Some(&meta(ttl + TimeDelta::seconds(1))), ArtifactKind::Tool, now));
    assert!(!policy.is_valid_at(None, ArtifactKind::Tool, now));

    std::fs::remove_file(&path).unwrap();
    assert!(!policy.is_valid_at(Some(&meta(TimeDelta::zero())), ArtifactKind::Tool, now));
}

#[tokio::test]
async fn fetched_artifact_is_immediately_valid() {
    let ctx = TestContext::new();
    let artifacts = ArtifactStore::new(ctx.path().join("cache"));
    let fetcher = Fetcher::new(Arc::new(MockTransport::serving("body")), Endpoints::public().unwrap());
    let target = ArtifactTarget {
        id: "merger",
        kind: ArtifactKind::Tool,
        file_name: "merger.py",
    };
    let locator = SourceLocator::repo("acme", "tools", "merger.py").unwrap();

    let meta = fetcher
        .fetch_artifact(&artifacts, target, &locator, &NoProgress)
        .await
        .unwrap();

    let policy = TtlPolicy::default();
    let read_back = artifacts.read_meta(ArtifactKind::Tool, "merger");
    assert_eq!(read_back.as_ref(), Some(&meta));
    assert!(policy.is_valid(read_back.as_ref(), ArtifactKind::Tool));
    assert!(!policy.is_valid(read_back.as_ref(), ArtifactKind::Asset));

    assert_eq!(artifacts.invalidate(ArtifactKind::Tool).unwrap(), 1);
    assert!(!policy.is_valid(artifacts.read_meta(ArtifactKind::Tool, "merger").as_ref(), ArtifactKind::Tool));
}

#[test]
fn fingerprint_is_stable_for_same_raw_identity() {
    let a = MachineIdentity::from_raw("machine-guid-1", IdentitySource::Platform("test"));
    let b = MachineIdentity::from_raw("machine-guid-1", IdentitySource::Platform("test"));
    let c = MachineIdentity::from_raw("machine-guid-2", IdentitySource::Platform("test"));
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert_eq!(a.fingerprint().as_str().len(), 16);
    assert!(a.fingerprint().as_str().bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
}

#[tokio::test]
async fn detected_identity_is_memoized() {
    let options = runway_core::IdentityOptions::default();
    let first = MachineIdentity::current(&options).await;
    let second = MachineIdentity::current(&options).await;
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.fingerprint(), second.fingerprint());
}
