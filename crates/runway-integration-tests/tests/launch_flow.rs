//! Integration tests for the launch pipeline and process supervision.

mod common;

use common::Harness;
use runway_core::NoProgress;
use runway_launcher::{LAUNCH_MARKER_ENV, LaunchError, LaunchOutcome, ToolState, bootstrap};
use runway_test::{MockPackageManager, MockTransport, test_catalog, test_identity, test_tool, tool_id};

async fn launcher(harness: &Harness, catalog: runway_launcher::Catalog) -> runway_launcher::Launcher {
    bootstrap(&test_identity(), harness.bootstrap_options(catalog, None), &NoProgress)
        .await
        .unwrap()
        .launcher
}

#[tokio::test]
async fn concurrent_launches_produce_one_process() {
    let harness = Harness::new(MockTransport::serving("#!/bin/sh\n"));
    let launcher = launcher(&harness, test_catalog(&["merger"])).await;

    let (first, second) = tokio::join!(
        launcher.launch("merger", &NoProgress),
        launcher.launch("merger", &NoProgress)
    );

    let outcomes = [&first, &second];
    assert_eq!(outcomes.iter().filter(|o| o.is_launched()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, LaunchOutcome::AlreadyRunning(_)))
            .count(),
        1
    );
    assert_eq!(harness.spawner.spawned(), 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test]
async fn relaunch_after_exit_reuses_valid_cache() {
    let harness = Harness::new(MockTransport::serving("#!/bin/sh\n"));
    let launcher = launcher(&harness, test_catalog(&["merger"])).await;

    assert!(launcher.launch("merger", &NoProgress).await.is_launched());
    harness.spawner.exit_all();
    assert_eq!(launcher.supervisor().state(&tool_id("merger")), ToolState::NotRunning);

    let again = launcher.launch("merger", &NoProgress).await;
    assert!(matches!(again, LaunchOutcome::Launched { downloaded: false, .. }));
    assert_eq!(harness.transport.calls(), 1);
    assert_eq!(harness.spawner.spawned(), 2);
}

#[tokio::test]
async fn spawned_tool_carries_nested_launch_marker() {
    let harness = Harness::new(MockTransport::serving("#!/bin/sh\n"));
    let launcher = launcher(&harness, test_catalog(&["merger"])).await;
    assert!(launcher.launch("merger", &NoProgress).await.is_launched());

    let request = &harness.spawner.requests()[0];
    assert!(
        request
            .env
            .iter()
            .any(|(k, v)| k == LAUNCH_MARKER_ENV && v == "1")
    );
    assert_eq!(request.working_dir.as_deref(), request.program.parent());
}

#[tokio::test]
async fn missing_packages_are_installed_before_fetch() {
    let harness = Harness::new(MockTransport::serving("print(1)"))
        .with_packages(MockPackageManager::new().with_installed(&["pysrt"]));
    let catalog = runway_launcher::Catalog::new(
        vec![test_tool("merger").with_packages(vec!["pysrt".into(), "chardet".into()])],
        Vec::new(),
    );
    let launcher = launcher(&harness, catalog).await;

    assert!(launcher.launch("merger", &NoProgress).await.is_launched());
    assert_eq!(
        harness.packages.log(),
        vec!["show pysrt", "show chardet", "install chardet"]
    );
}

#[tokio::test]
async fn failed_install_fails_only_that_launch() {
    let harness = Harness::new(MockTransport::serving("print(1)"))
        .with_packages(MockPackageManager::new().with_broken("numpy"));
    let catalog = runway_launcher::Catalog::new(
        vec![
            test_tool("heavy").with_packages(vec!["numpy".into(), "never".into()]),
            test_tool("light"),
        ],
        Vec::new(),
    );
    let launcher = launcher(&harness, catalog).await;

    let outcome = launcher.launch("heavy", &NoProgress).await;
    assert!(matches!(
        outcome,
        LaunchOutcome::Failed {
            error: LaunchError::Provision(_),
            ..
        }
    ));
    assert_eq!(harness.transport.calls(), 0);
    assert!(!harness.packages.log().contains(&"show never".to_owned()));

    assert!(launcher.launch("light", &NoProgress).await.is_launched());
}

#[tokio::test]
async fn refused_spawn_releases_the_slot() {
    let mut harness = Harness::new(MockTransport::serving("#!/bin/sh\n"));
    harness.spawner = runway_test::MockSpawner::refusing();
    let launcher = launcher(&harness, test_catalog(&["merger"])).await;

    let outcome = launcher.launch("merger", &NoProgress).await;
    assert!(matches!(
        outcome,
        LaunchOutcome::Failed {
            error: LaunchError::Spawn { .. },
            ..
        }
    ));
    assert_eq!(launcher.supervisor().state(&tool_id("merger")), ToolState::NotRunning);
}

#[tokio::test]
async fn update_redownloads_and_shutdown_stops_everything() {
    let harness = Harness::new(MockTransport::serving("#!/bin/sh\n"));
    let launcher = launcher(&harness, test_catalog(&["a", "b"])).await;
    assert!(launcher.launch("a", &NoProgress).await.is_launched());
    assert!(launcher.launch("b", &NoProgress).await.is_launched());
    assert_eq!(harness.transport.calls(), 2);

    let report = launcher.update_all(&NoProgress).await.unwrap();
    assert_eq!(report.invalidated, 2);
    assert_eq!(report.updated.len(), 2);
    assert_eq!(harness.transport.calls(), 4);

    let stopped = launcher.shutdown();
    assert_eq!(stopped.stopped, vec![tool_id("a"), tool_id("b")]);
    assert_eq!(harness.spawner.alive(), 0);
    assert_eq!(launcher.supervisor().active_count(), 0);
}
