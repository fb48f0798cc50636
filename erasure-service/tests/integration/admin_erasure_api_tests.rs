// tests/integration/admin_erasure_api_tests.rs

use crate::common::app_helper::{TestHarness, ADMIN_TOKEN};
use crate::common::fakes::FaultyPurgeBackend;
use crate::common::request::{body_json, get_request, json_request, operator_request};
use crate::common::test_data::{seed_marketplace, seed_subject};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use erasure_service::domain::deletion_request_model::{
    DeletionStatus, RequestSelector, StatusTransition,
};
use erasure_service::domain::subject::SubjectType;
use erasure_service::repository::deletion_request_repository::DeletionRequestStore;
use erasure_service::service::erasure_lifecycle_service::RequestDeletionOptions;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_admin_routes_require_operator_token() {
    let harness = TestHarness::new();
    let app = harness.router();

    let missing = app
        .clone()
        .oneshot(json_request("POST", "/admin/erasure/run", &json!({})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .oneshot(operator_request(
            "POST",
            "/admin/erasure/recover-stale",
            "not-the-token",
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(wrong).await["error_type"], "forbidden");
}

#[tokio::test]
async fn test_operator_can_skip_grace_period_and_run_batch() {
    let harness = TestHarness::new();
    let seeded = seed_marketplace(&harness.records).await;
    let app = harness.router();

    let res = app
        .clone()
        .oneshot(operator_request(
            "POST",
            "/admin/erasure/requests",
            ADMIN_TOKEN,
            &json!({
                "subject_id": seeded.renter_id,
                "subject_type": "renter",
                "reason": "Support ticket 4411",
                "skip_grace_period": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    let request = &body["data"]["request"];
    assert_eq!(request["requested_at"], request["scheduled_deletion_at"]);
    let request_id = request["id"].as_str().unwrap().to_string();

    // 本人確認は省略できない
    let links = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            if let Some(links) = harness.notifier.sent().into_iter().next() {
                break links;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("notification was never sent");

    let before_verify = app
        .clone()
        .oneshot(operator_request("POST", "/admin/erasure/run", ADMIN_TOKEN, &json!({})))
        .await
        .unwrap();
    assert_eq!(before_verify.status(), StatusCode::OK);
    assert_eq!(body_json(before_verify).await["data"]["processed"], 0);

    harness
        .lifecycle()
        .verify_deletion(&links.verify_token)
        .await
        .unwrap();

    let run = app
        .oneshot(operator_request("POST", "/admin/erasure/run", ADMIN_TOKEN, &json!({})))
        .await
        .unwrap();
    assert_eq!(run.status(), StatusCode::OK);
    let body = body_json(run).await;
    assert_eq!(body["data"]["processed"], 1);
    assert_eq!(body["data"]["completed"], 1);
    assert_eq!(body["data"]["failed"], 0);
    let result = &body["data"]["results"][0];
    assert_eq!(result["request_id"], request_id.as_str());
    assert_eq!(result["status"], "completed");
    assert_eq!(result["rows_anonymized"], 1);
    assert!(result["executed_at"].is_string());
}

#[tokio::test]
async fn test_requeue_failed_request() {
    let builder = TestHarness::builder();
    let faulty = Arc::new(FaultyPurgeBackend::new(builder.records()).failing_everywhere());
    let harness = builder.purge_backend(faulty).build();
    let subject_id = seed_subject(&harness.records, SubjectType::Landlord).await;
    let app = harness.router();

    let created = harness
        .lifecycle()
        .request_deletion(
            subject_id,
            SubjectType::Landlord,
            RequestDeletionOptions {
                skip_grace_period: true,
                reason: None,
            },
        )
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion(&created.verification_token)
        .await
        .unwrap();

    let run = app
        .clone()
        .oneshot(operator_request("POST", "/admin/erasure/run", ADMIN_TOKEN, &json!({})))
        .await
        .unwrap();
    let body = body_json(run).await;
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["results"][0]["status"], "failed");

    // 公開ビューには失敗理由を出さない
    let public = app
        .clone()
        .oneshot(get_request(&format!("/erasure/requests/{}", created.request.id)))
        .await
        .unwrap();
    assert_eq!(public.status(), StatusCode::OK);
    let body = body_json(public).await;
    assert_eq!(body["data"]["status"], "failed");
    assert!(body["data"].get("last_error").is_none());
    assert!(!body.to_string().contains("simulated failure"));

    let uri = format!("/admin/erasure/requests/{}/requeue", created.request.id);
    let requeued = app
        .clone()
        .oneshot(operator_request("POST", &uri, ADMIN_TOKEN, &json!({})))
        .await
        .unwrap();
    assert_eq!(requeued.status(), StatusCode::OK);
    let body = body_json(requeued).await;
    assert_eq!(body["data"]["status"], "verified");
    assert_eq!(body["data"]["attempts"], 1);
    assert_eq!(body["data"].get("last_error"), Some(&serde_json::Value::Null));

    // failed 以外からは再投入できない
    let again = app
        .oneshot(operator_request("POST", &uri, ADMIN_TOKEN, &json!({})))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_recover_stale_releases_old_claims() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Agency).await;
    let app = harness.router();

    let long_ago = Utc::now() - Duration::hours(3);
    let created = harness
        .lifecycle()
        .request_deletion_at(
            subject_id,
            SubjectType::Agency,
            RequestDeletionOptions {
                skip_grace_period: true,
                reason: None,
            },
            long_ago,
        )
        .await
        .unwrap();
    harness
        .lifecycle()
        .verify_deletion_at(&created.verification_token, long_ago)
        .await
        .unwrap();
    harness
        .store
        .apply(
            RequestSelector::Id(created.request.id),
            StatusTransition::claim(long_ago + Duration::minutes(5)),
        )
        .await
        .unwrap()
        .unwrap();

    let res = app
        .oneshot(operator_request(
            "POST",
            "/admin/erasure/recover-stale",
            ADMIN_TOKEN,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["recovered"], 1);
    assert_eq!(
        body["data"]["request_ids"][0],
        created.request.id.to_string()
    );

    let stored = harness
        .lifecycle()
        .get_request(created.request.id)
        .await
        .unwrap();
    assert_eq!(stored.status, DeletionStatus::Verified);
    assert_eq!(stored.attempts, 1);
}
