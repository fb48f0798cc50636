// tests/unit/scheduler_tests.rs

use crate::common::app_helper::TestHarness;
use crate::common::test_data::{rows_referencing, seed_marketplace};
use chrono::{Duration, Utc};
use erasure_service::app::build_scheduler;
use erasure_service::domain::deletion_request_model::{
    DeletionStatus, RequestSelector, StatusTransition,
};
use erasure_service::domain::subject::SubjectType;
use erasure_service::repository::deletion_request_repository::DeletionRequestStore;
use erasure_service::service::erasure_lifecycle_service::RequestDeletionOptions;

fn immediate() -> RequestDeletionOptions {
    RequestDeletionOptions {
        skip_grace_period: true,
        reason: None,
    }
}

#[tokio::test]
async fn test_run_once_recovers_stale_claim_then_completes_it() {
    let harness = TestHarness::new();
    let seeded = seed_marketplace(&harness.records).await;
    let started = Utc::now() - Duration::hours(3);

    let created = harness
        .lifecycle()
        .request_deletion_at(seeded.renter_id, SubjectType::Renter, immediate(), started)
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, started)
        .await
        .unwrap();
    // ワーカーが途中で落ちた状態を作る
    harness
        .store
        .apply(
            RequestSelector::Id(created.request.id),
            StatusTransition::claim(started + Duration::minutes(1)),
        )
        .await
        .unwrap()
        .unwrap();

    build_scheduler(&harness.state).run_once().await;

    let stored = harness
        .lifecycle()
        .get_request(created.request.id)
        .await
        .unwrap();
    assert_eq!(stored.status, DeletionStatus::Completed);
    assert_eq!(stored.attempts, 2);
    assert_eq!(
        rows_referencing(&harness.records, "renter_profiles", "id", seeded.renter_id).await,
        0
    );
}

#[tokio::test]
async fn test_run_once_leaves_fresh_claims_alone() {
    let harness = TestHarness::new();
    let seeded = seed_marketplace(&harness.records).await;
    let now = Utc::now();

    let created = harness
        .lifecycle()
        .request_deletion_at(seeded.agency_id, SubjectType::Agency, immediate(), now)
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, now)
        .await
        .unwrap();
    harness
        .store
        .apply(
            RequestSelector::Id(created.request.id),
            StatusTransition::claim(now),
        )
        .await
        .unwrap()
        .unwrap();

    build_scheduler(&harness.state).run_once().await;

    let stored = harness
        .lifecycle()
        .get_request(created.request.id)
        .await
        .unwrap();
    assert_eq!(stored.status, DeletionStatus::Processing);
    assert_eq!(stored.attempts, 1);
}
