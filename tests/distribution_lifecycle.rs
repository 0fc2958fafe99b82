//! Lifecycle controller behavior against a scripted repository service.

mod common;

use common::{FakeService, local, records};
use rbdist::bundle::{BundleDescriptor, DistributionRule, DistributionStatus, ReleaseBundleIdentity};
use rbdist::error::{LifecycleError, ServiceError};
use rbdist::lifecycle::{DistributionMode, DistributionOutcome, LifecycleController};
use rbdist::poll::PollPolicy;
use rbdist::service::{DeleteRequest, DistributionRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn identity() -> ReleaseBundleIdentity {
    ReleaseBundleIdentity::new("b1", "1")
}

fn controller(service: &Arc<FakeService>, attempts: u32) -> LifecycleController {
    LifecycleController::new(service.clone(), PollPolicy::immediate(attempts))
}

fn descriptor(sign: bool) -> BundleDescriptor {
    BundleDescriptor::builder(identity())
        .pattern("dist-repo/data/b*.in")
        .sign(sign)
        .build()
        .expect("valid descriptor")
}

fn distribution() -> DistributionRequest {
    DistributionRequest {
        identity: identity(),
        rules: vec![DistributionRule::default()],
        dry_run: false,
    }
}

fn delete_request() -> DeleteRequest {
    DeleteRequest {
        identity: identity(),
        sites: vec![DistributionRule::default()],
        delete_from_distribution: true,
        dry_run: false,
    }
}

#[tokio::test]
async fn create_sign_and_distribute_waits_for_completion() {
    let service = FakeService::new();
    service.script_distribution([
        Ok(None),
        records(&[("site-a", "In progress")]),
        records(&[("site-a", "In progress")]),
        records(&[("site-a", "Completed")]),
    ]);
    let controller = controller(&service, 10);

    let created = controller.create(&descriptor(false)).await.expect("create");
    assert_eq!(created, identity());
    controller.sign(&created, None).await.expect("sign");

    let outcome = controller
        .distribute(&distribution(), DistributionMode::Wait)
        .await
        .expect("distribution completes");

    let DistributionOutcome::Completed { records } = outcome else {
        panic!("expected a completed distribution");
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DistributionStatus::Completed);
    assert_eq!(records[0].target(), "site-a");
    assert_eq!(service.state().distribution_queries, 4);

    controller
        .wait_for_local_existence(&created, true)
        .await
        .expect("bundle still exists locally after distribution");
}

#[tokio::test]
async fn fire_and_forget_does_not_poll() {
    let service = FakeService::new();
    service.seed(&identity(), "SIGNED");

    let outcome = controller(&service, 10)
        .distribute(&distribution(), DistributionMode::FireAndForget)
        .await
        .expect("distribution triggered");

    assert_eq!(outcome, DistributionOutcome::Triggered);
    assert_eq!(service.state().distribution_queries, 0);
}

#[tokio::test]
async fn dry_run_distribution_never_waits() {
    let service = FakeService::new();
    service.seed(&identity(), "SIGNED");
    let request = DistributionRequest {
        dry_run: true,
        ..distribution()
    };

    let outcome = controller(&service, 10)
        .distribute(&request, DistributionMode::Wait)
        .await
        .expect("dry run accepted");

    assert_eq!(outcome, DistributionOutcome::Triggered);
    assert_eq!(service.state().distribution_queries, 0);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let service = FakeService::new();
    service.seed(&identity(), "OPEN");
    let controller = controller(&service, 5);

    for _ in 0..2 {
        controller
            .delete(&delete_request())
            .await
            .expect("delete succeeds whether or not the bundle exists");
        controller
            .wait_for_local_existence(&identity(), false)
            .await
            .expect("bundle is gone");
    }

    assert_eq!(service.state().calls, vec!["delete b1/1", "delete b1/1"]);
}

#[tokio::test]
async fn existence_wait_serves_both_directions() {
    let service = FakeService::new();
    let present = local(&identity(), Some("OPEN"));
    service.script_local([Ok(None), Ok(None), Ok(Some(present.clone()))]);
    let controller = controller(&service, 10);

    controller
        .wait_for_local_existence(&identity(), true)
        .await
        .expect("bundle appears");
    assert_eq!(service.state().local_queries, 3);

    service.script_local([Ok(Some(present)), Ok(None)]);
    controller
        .wait_for_local_existence(&identity(), false)
        .await
        .expect("bundle disappears");
    assert_eq!(service.state().local_queries, 5);
}

#[tokio::test]
async fn existence_wait_accepts_a_bundle_without_reported_state() {
    let service = FakeService::new();
    service.script_local([Ok(Some(local(&identity(), None)))]);

    controller(&service, 3)
        .wait_for_local_existence(&identity(), true)
        .await
        .expect("present bundle counts as existing");
    assert_eq!(service.state().local_queries, 1);
}

#[tokio::test]
async fn updating_a_missing_bundle_is_not_found() {
    let service = FakeService::new();

    let result = controller(&service, 5).update(&descriptor(false)).await;

    match result {
        Err(LifecycleError::NotFound { bundle }) => assert_eq!(bundle, "b1/1"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(service.state().calls, vec!["update b1/1"]);
}

#[tokio::test]
async fn updating_an_open_bundle_succeeds() {
    let service = FakeService::new();
    service.seed(&identity(), "OPEN");

    controller(&service, 5)
        .update(&descriptor(false))
        .await
        .expect("open bundle accepts new content");

    assert_eq!(service.state().calls, vec!["update b1/1"]);
}

#[tokio::test]
async fn signing_without_a_key_is_a_signing_failure() {
    let service = FakeService::new();
    service.seed(&identity(), "OPEN");
    service.with(|state| {
        state.sign_error = Some(ServiceError::Rejected {
            status: 400,
            message: "no GPG signing key configured".to_string(),
        });
    });

    let result = controller(&service, 5).sign(&identity(), None).await;

    match result {
        Err(LifecycleError::SigningRejected { bundle, reason }) => {
            assert_eq!(bundle, "b1/1");
            assert!(reason.contains("no GPG signing key"));
        }
        other => panic!("expected SigningRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn resigning_a_signed_bundle_succeeds() {
    let service = FakeService::new();
    service.seed(&identity(), "SIGNED");
    service.with(|state| {
        state.sign_error = Some(ServiceError::Rejected {
            status: 409,
            message: "already signed".to_string(),
        });
    });

    controller(&service, 5)
        .sign(&identity(), None)
        .await
        .expect("repeat signing is a no-op");
}

#[tokio::test]
async fn signing_a_missing_bundle_is_not_found() {
    let service = FakeService::new();
    let result = controller(&service, 5).sign(&identity(), None).await;
    assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_creation_is_rejected() {
    let service = FakeService::new();
    service.seed(&identity(), "OPEN");

    let result = controller(&service, 5).create(&descriptor(false)).await;

    assert!(matches!(result, Err(LifecycleError::CreationRejected { .. })));
}

#[tokio::test]
async fn distributing_an_unsigned_bundle_is_rejected() {
    let service = FakeService::new();
    service.seed(&identity(), "OPEN");

    let result = controller(&service, 5)
        .distribute(&distribution(), DistributionMode::Wait)
        .await;

    assert!(matches!(result, Err(LifecycleError::ValidationRejected { .. })));
    assert_eq!(service.state().distribution_queries, 0);
}

#[tokio::test]
async fn partial_failure_stops_polling_and_names_the_site() {
    let service = FakeService::new();
    service.seed(&identity(), "SIGNED");
    service.script_distribution([records(&[("site-a", "Completed"), ("site-b", "Failed")])]);

    let result = controller(&service, 10)
        .distribute(&distribution(), DistributionMode::Wait)
        .await;

    match result {
        Err(LifecycleError::PollFailed { reason, .. }) => assert!(reason.contains("site-b")),
        other => panic!("expected PollFailed, got {other:?}"),
    }
    assert_eq!(service.state().distribution_queries, 1);
}

#[tokio::test]
async fn failure_waits_until_every_site_is_terminal() {
    let service = FakeService::new();
    service.script_distribution([
        records(&[("site-a", "In progress"), ("site-b", "Failed")]),
        records(&[("site-a", "Completed"), ("site-b", "Failed")]),
    ]);

    let result = controller(&service, 10).wait_for_distribution(&identity()).await;

    assert!(matches!(result, Err(LifecycleError::PollFailed { .. })));
    assert_eq!(service.state().distribution_queries, 2);
}

#[tokio::test]
async fn stuck_distribution_times_out_after_the_exact_budget() {
    let service = FakeService::new();
    service.with(|state| {
        state
            .distribution
            .insert(identity(), vec![common::record("1", "site-a", "In progress")]);
    });

    let result = controller(&service, 5).wait_for_distribution(&identity()).await;

    assert!(matches!(
        result,
        Err(LifecycleError::PollTimedOut { attempts: 5, .. })
    ));
    assert_eq!(service.state().distribution_queries, 5);
}

#[tokio::test]
async fn empty_record_list_is_retried_not_terminal() {
    let service = FakeService::new();
    service.script_distribution([
        Ok(Some(vec![])),
        Ok(Some(vec![])),
        records(&[("site-a", "Completed")]),
    ]);

    let records = controller(&service, 10)
        .wait_for_distribution(&identity())
        .await
        .expect("completes once indexed");

    assert_eq!(records.len(), 1);
    assert_eq!(service.state().distribution_queries, 3);
}

#[tokio::test]
async fn transport_error_aborts_the_wait_immediately() {
    let service = FakeService::new();
    service.script_distribution([Err(ServiceError::Transport {
        reason: "connection reset".to_string(),
    })]);

    let result = controller(&service, 10).wait_for_distribution(&identity()).await;

    assert!(matches!(result, Err(LifecycleError::Transport { .. })));
    assert_eq!(service.state().distribution_queries, 1);
}

#[tokio::test]
async fn unknown_distribution_status_is_surfaced() {
    let service = FakeService::new();
    service.script_distribution([records(&[("site-a", "Queued")])]);

    let result = controller(&service, 10).wait_for_distribution(&identity()).await;

    assert!(matches!(result, Err(LifecycleError::State(_))));
}

#[tokio::test]
async fn deletion_wait_ends_when_the_index_forgets_the_bundle() {
    let service = FakeService::new();
    service.script_distribution([records(&[("site-a", "Completed")]), Ok(None)]);

    controller(&service, 10)
        .wait_for_deletion(&identity())
        .await
        .expect("deletion observed");

    assert_eq!(service.state().distribution_queries, 2);
}

#[tokio::test]
async fn cancelled_wait_reports_cancellation() {
    let service = FakeService::new();
    let token = CancellationToken::new();
    token.cancel();

    let result = controller(&service, 10)
        .with_cancellation(token)
        .wait_for_distribution(&identity())
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::PollCancelled { attempts: 0, .. })
    ));
    assert_eq!(service.state().distribution_queries, 0);
}

#[tokio::test]
async fn status_reports_both_axes() {
    let service = FakeService::new();
    service.seed(&identity(), "READY_FOR_DISTRIBUTION");
    service.script_distribution([records(&[("site-a", "Not distributed")])]);

    let status = controller(&service, 1)
        .status(&identity())
        .await
        .expect("status");

    let local = status.local.expect("bundle exists");
    assert!(local.state.expect("state reported").is_signed());
    let records = status.distribution.expect("records reported");
    assert_eq!(records[0].status, DistributionStatus::NotDistributed);
}

#[tokio::test]
async fn status_of_an_unknown_bundle_is_empty_not_an_error() {
    let service = FakeService::new();

    let status = controller(&service, 1)
        .status(&identity())
        .await
        .expect("status");

    assert_eq!(status.local, None);
    assert_eq!(status.distribution, None);
}

#[tokio::test]
async fn authentication_failures_are_distinct() {
    let service = FakeService::new();
    service.with(|state| {
        state.create_error = Some(ServiceError::Unauthorized { status: 401 });
    });

    let result = controller(&service, 1).create(&descriptor(true)).await;

    assert!(matches!(
        result,
        Err(LifecycleError::AuthenticationFailed { status: 401, .. })
    ));
}
