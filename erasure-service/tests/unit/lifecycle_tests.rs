// tests/unit/lifecycle_tests.rs

use crate::common::app_helper::TestHarness;
use crate::common::fakes::{FailingAuditSink, FailingNotificationGateway};
use crate::common::t0;
use crate::common::test_data::seed_subject;
use chrono::{Duration, TimeZone, Utc};
use erasure_service::domain::deletion_request_model::DeletionStatus;
use erasure_service::domain::erasure_audit_event_model::AuditEventKind;
use erasure_service::domain::subject::SubjectType;
use erasure_service::error::AppError;
use erasure_service::repository::deletion_request_repository::DeletionRequestStore;
use erasure_service::service::erasure_lifecycle_service::RequestDeletionOptions;
use erasure_service::service::token_issuer::hash_token;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_request_uses_thirty_day_grace_period() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();

    assert_eq!(created.request.status, DeletionStatus::PendingVerification);
    assert_eq!(created.request.requested_at, t0());
    assert_eq!(
        created.request.scheduled_deletion_at,
        Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()
    );
    assert_eq!(created.request.attempts, 0);
    assert!(created.request.verified_at.is_none());
}

#[tokio::test]
async fn test_skip_grace_period_schedules_immediately() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Landlord).await;

    let created = harness
        .lifecycle()
        .request_deletion_at(
            subject_id,
            SubjectType::Landlord,
            RequestDeletionOptions {
                skip_grace_period: true,
                reason: None,
            },
            t0(),
        )
        .await
        .unwrap();

    assert_eq!(created.request.scheduled_deletion_at, created.request.requested_at);
}

#[tokio::test]
async fn test_tokens_are_delivered_and_only_hashes_stored() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();
    created.notification.await.unwrap();

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject_id, subject_id);
    assert_eq!(sent[0].verify_token, created.verification_token);
    assert_eq!(sent[0].cancel_token, created.cancellation_token);

    let stored = harness
        .store
        .find_by_id(created.request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.verification_token_hash.as_deref(),
        Some(hash_token(&created.verification_token).as_str())
    );
    assert_ne!(
        stored.verification_token_hash.as_deref(),
        Some(created.verification_token.as_str())
    );
}

#[tokio::test]
async fn test_unknown_subject_is_rejected() {
    let harness = TestHarness::new();
    let subject_id = Uuid::new_v4();

    let result = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Agency, Default::default(), t0())
        .await;

    assert!(matches!(
        result,
        Err(AppError::SubjectNotFound { subject_id: id, subject_type: SubjectType::Agency }) if id == subject_id
    ));
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_subject_type_must_match_profile() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let result = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Landlord, Default::default(), t0())
        .await;

    assert!(matches!(result, Err(AppError::SubjectNotFound { .. })));
}

#[tokio::test]
async fn test_reason_longer_than_limit_is_rejected() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let result = harness
        .lifecycle()
        .request_deletion_at(
            subject_id,
            SubjectType::Renter,
            RequestDeletionOptions {
                skip_grace_period: false,
                reason: Some("あ".repeat(1001)),
            },
            t0(),
        )
        .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_at_most_one_open_request_per_subject() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let mut created = 0;
    let mut duplicates = 0;
    for i in 0..20 {
        let result = harness
            .lifecycle()
            .request_deletion_at(
                subject_id,
                SubjectType::Renter,
                Default::default(),
                t0() + Duration::minutes(i),
            )
            .await;
        match result {
            Ok(_) => created += 1,
            Err(AppError::DuplicateRequest(id)) => {
                assert_eq!(id, subject_id);
                duplicates += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }

        let open = harness
            .store
            .find_by_subject(subject_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| !r.is_terminal())
            .count();
        assert!(open <= 1);
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 19);
}

#[tokio::test]
async fn test_concurrent_requests_create_single_open_request() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let lifecycle = harness.lifecycle();

    let (a, b, c) = tokio::join!(
        lifecycle.request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0()),
        lifecycle.request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0()),
        lifecycle.request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0()),
    );

    let successes = [a.is_ok(), b.is_ok(), c.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(harness.store.len().await, 1);
}

#[tokio::test]
async fn test_new_request_allowed_after_cancellation() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let first = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();
    harness
        .lifecycle()
        .cancel_deletion_at(&first.cancellation_token, t0() + Duration::hours(1))
        .await
        .unwrap();

    let second = harness
        .lifecycle()
        .request_deletion_at(
            subject_id,
            SubjectType::Renter,
            Default::default(),
            t0() + Duration::hours(2),
        )
        .await
        .unwrap();

    assert_ne!(first.request.id, second.request.id);
    assert_eq!(harness.store.find_by_subject(subject_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_verify_sets_verified_at_to_call_time() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();

    let verified_at = t0() + Duration::hours(3);
    let verified = harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, verified_at)
        .await
        .unwrap();

    assert_eq!(verified.id, created.request.id);
    assert_eq!(verified.status, DeletionStatus::Verified);
    assert_eq!(verified.verified_at, Some(verified_at));
    assert_eq!(verified.scheduled_deletion_at, created.request.scheduled_deletion_at);
    assert!(verified.verification_token_hash.is_none());
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();

    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0())
        .await
        .unwrap();
    let second = harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0())
        .await;

    assert!(matches!(second, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_unknown_tokens_are_invalid() {
    let harness = TestHarness::new();

    for token in ["", "   ", "deadbeef"] {
        assert!(matches!(
            harness.lifecycle().verify_deletion_at(token, t0()).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            harness.lifecycle().cancel_deletion_at(token, t0()).await,
            Err(AppError::InvalidToken)
        ));
    }
}

#[tokio::test]
async fn test_cancellation_token_cannot_verify() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();

    let result = harness
        .lifecycle()
        .verify_deletion_at(&created.cancellation_token, t0())
        .await;

    assert!(matches!(result, Err(AppError::InvalidToken)));
    let stored = harness.lifecycle().get_request(created.request.id).await.unwrap();
    assert_eq!(stored.status, DeletionStatus::PendingVerification);
}

#[tokio::test]
async fn test_cancel_before_verification_invalidates_verify_token() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();

    let cancelled = harness
        .lifecycle()
        .cancel_deletion_at(&created.cancellation_token, t0() + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(cancelled.status, DeletionStatus::Cancelled);

    let verify = harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0() + Duration::minutes(6))
        .await;
    assert!(matches!(verify, Err(AppError::InvalidToken)));

    let stored = harness.lifecycle().get_request(created.request.id).await.unwrap();
    assert_eq!(stored.status, DeletionStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_after_verification() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Agency).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Agency, Default::default(), t0())
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0())
        .await
        .unwrap();

    let cancelled = harness
        .lifecycle()
        .cancel_deletion_at(&created.cancellation_token, t0() + Duration::days(10))
        .await
        .unwrap();
    assert_eq!(cancelled.status, DeletionStatus::Cancelled);

    // 取消トークンも一度きり
    let again = harness
        .lifecycle()
        .cancel_deletion_at(&created.cancellation_token, t0() + Duration::days(11))
        .await;
    assert!(matches!(again, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_request() {
    let harness = TestHarness::builder()
        .notifier(Arc::new(FailingNotificationGateway))
        .build();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();
    created.notification.await.unwrap();

    let stored = harness.lifecycle().get_request(created.request.id).await.unwrap();
    assert_eq!(stored.status, DeletionStatus::PendingVerification);
    assert_eq!(
        harness.audit.kinds_for(created.request.id),
        vec![AuditEventKind::Requested, AuditEventKind::NotificationFailed]
    );
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_transitions() {
    let harness = TestHarness::builder()
        .audit(Arc::new(FailingAuditSink))
        .build();
    let subject_id = seed_subject(&harness.records, SubjectType::Admin).await;

    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Admin, Default::default(), t0())
        .await
        .unwrap();
    let verified = harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0())
        .await
        .unwrap();

    assert_eq!(verified.status, DeletionStatus::Verified);
}

#[tokio::test]
async fn test_transitions_are_audited() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let created = harness
        .lifecycle()
        .request_deletion_at(subject_id, SubjectType::Renter, Default::default(), t0())
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, t0())
        .await
        .unwrap();
    harness
        .lifecycle()
        .cancel_deletion_at(&created.cancellation_token, t0())
        .await
        .unwrap();

    assert_eq!(
        harness.audit.kinds_for(created.request.id),
        vec![
            AuditEventKind::Requested,
            AuditEventKind::Verified,
            AuditEventKind::Cancelled
        ]
    );
}

#[tokio::test]
async fn test_get_request_not_found() {
    let harness = TestHarness::new();
    let result = harness.lifecycle().get_request(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
