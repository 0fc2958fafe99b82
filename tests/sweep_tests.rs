//! Cleanup sweep driven through the lifecycle controller.

mod common;

use chrono::{DateTime, Utc};
use common::FakeService;
use rbdist::bundle::ReleaseBundleIdentity;
use rbdist::error::ServiceError;
use rbdist::lifecycle::LifecycleController;
use rbdist::poll::PollPolicy;
use rbdist::sweep::{NameMatcher, default_max_age, sweep_stale_bundles};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).expect("valid timestamp")
}

fn seeded(names: &[&str]) -> std::sync::Arc<FakeService> {
    let service = FakeService::new();
    for name in names {
        service.seed(&ReleaseBundleIdentity::new(*name, "1.0"), "SIGNED");
        service.state().names.push(name.to_string());
    }
    service
}

#[tokio::test]
async fn only_stale_bundles_are_deleted() {
    let service = seeded(&["cli-test-1700000000", "cli-test-1000000000", "release-2024"]);
    let controller = LifecycleController::new(service.clone(), PollPolicy::immediate(1));
    let matcher = NameMatcher::new(&["cli-test"]).expect("valid base name");

    let report = sweep_stale_bundles(
        &controller,
        &matcher,
        "1.0",
        at(1_700_000_000 + 3600),
        default_max_age(),
    )
    .await;

    assert_eq!(report.deleted, vec!["cli-test-1000000000"]);
    assert_eq!(report.kept, vec!["cli-test-1700000000"]);
    assert!(report.is_clean());
    assert_eq!(service.state().calls, vec!["delete cli-test-1000000000/1.0"]);
}

#[tokio::test]
async fn delete_failures_are_reported_and_skipped() {
    let service = seeded(&["cli-test-1000000000", "cli-test-1000000001"]);
    service.with(|state| {
        state.delete_error = Some(ServiceError::Transport {
            reason: "connection refused".to_string(),
        });
    });
    let controller = LifecycleController::new(service.clone(), PollPolicy::immediate(1));
    let matcher = NameMatcher::new(&["cli-test"]).expect("valid base name");

    let report =
        sweep_stale_bundles(&controller, &matcher, "1.0", at(1_700_000_000), default_max_age())
            .await;

    assert_eq!(report.failed.len(), 2);
    assert!(report.deleted.is_empty());
    assert_eq!(service.state().calls.len(), 2);
}

#[tokio::test]
async fn already_deleted_bundles_count_as_deleted() {
    let service = FakeService::new();
    service.state().names.push("cli-test-1000000000".to_string());
    let controller = LifecycleController::new(service.clone(), PollPolicy::immediate(1));
    let matcher = NameMatcher::new(&["cli-test"]).expect("valid base name");

    let report =
        sweep_stale_bundles(&controller, &matcher, "1.0", at(1_700_000_000), default_max_age())
            .await;

    assert_eq!(report.deleted, vec!["cli-test-1000000000"]);
}
