//! Integration tests for the startup sequence and device authorization.

mod common;

use common::Harness;
use runway_core::NoProgress;
use runway_launcher::{AuthorizationMode, BootstrapError, Catalog, GateError, bootstrap};
use runway_test::{MockTransport, TEST_DEVICE_ID, device_list, test_asset, test_identity};

fn catalog_with_list(harness: &Harness, bundled_text: &str) -> Catalog {
    let bundled = harness.ctx.create_file("bundled/devices.js", bundled_text);
    Catalog::new(Vec::new(), vec![test_asset("devices", "devices.js", Some(bundled))])
}

#[tokio::test]
async fn missing_asset_is_open_mode() {
    let harness = Harness::new(MockTransport::failing());
    let catalog = Catalog::new(Vec::new(), vec![test_asset("devices", "devices.js", None)]);
    let started = bootstrap(&test_identity(), harness.bootstrap_options(catalog, Some("devices")), &NoProgress)
        .await
        .unwrap();
    assert_eq!(started.authorization, AuthorizationMode::NoAsset);
}

#[tokio::test]
async fn remote_list_matches_case_insensitively() {
    let list = device_list(&[&TEST_DEVICE_ID.to_uppercase(), "00000000-0000-0000-0000-000000000000"]);
    let harness = Harness::new(MockTransport::serving(&list));
    let catalog = Catalog::new(Vec::new(), vec![test_asset("devices", "devices.js", None)]);

    let started = bootstrap(&test_identity(), harness.bootstrap_options(catalog, Some("devices")), &NoProgress)
        .await
        .unwrap();
    assert_eq!(started.authorization, AuthorizationMode::Listed { entries: 2 });
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test]
async fn bundled_list_used_when_offline() {
    let harness = Harness::new(MockTransport::failing());
    let catalog = catalog_with_list(&harness, &device_list(&[TEST_DEVICE_ID]));
    let started = bootstrap(&test_identity(), harness.bootstrap_options(catalog, Some("devices")), &NoProgress)
        .await
        .unwrap();
    assert_eq!(started.authorization, AuthorizationMode::Listed { entries: 1 });
}

#[tokio::test]
async fn unlisted_device_gets_no_launcher() {
    let harness = Harness::new(MockTransport::failing());
    let catalog = catalog_with_list(&harness, &device_list(&["11111111-2222-3333-4444-555555555555"]));
    let result = bootstrap(&test_identity(), harness.bootstrap_options(catalog, Some("devices")), &NoProgress).await;

    let Err(BootstrapError::Gate(GateError::Denied { device_id, .. })) = result else {
        panic!("expected denial");
    };
    assert_eq!(device_id, TEST_DEVICE_ID);
    assert_eq!(harness.spawner.spawned(), 0);
}

#[tokio::test]
async fn empty_list_is_open_mode() {
    let harness = Harness::new(MockTransport::serving(&device_list(&[])));
    let catalog = Catalog::new(Vec::new(), vec![test_asset("devices", "devices.js", None)]);
    let started = bootstrap(&test_identity(), harness.bootstrap_options(catalog, Some("devices")), &NoProgress)
        .await
        .unwrap();
    assert_eq!(started.authorization, AuthorizationMode::NotConfigured);
}

#[tokio::test]
async fn second_start_in_same_epoch_reuses_location() {
    let harness = Harness::new(MockTransport::failing());
    let first = bootstrap(&test_identity(), harness.bootstrap_options(Catalog::default(), None), &NoProgress)
        .await
        .unwrap();
    let second = bootstrap(&test_identity(), harness.bootstrap_options(Catalog::default(), None), &NoProgress)
        .await
        .unwrap();
    assert!(!first.location.was_reused());
    assert!(second.location.was_reused());
    assert_eq!(first.location.path(), second.location.path());
}
