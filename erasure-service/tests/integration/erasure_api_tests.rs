// tests/integration/erasure_api_tests.rs

use crate::common::app_helper::TestHarness;
use crate::common::request::{body_json, get_request, json_request};
use crate::common::test_data::seed_subject;
use axum::http::StatusCode;
use erasure_service::domain::subject::SubjectType;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_create_request_returns_created_without_tokens() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let res = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({
                "subject_id": subject_id,
                "subject_type": "renter",
                "reason": "Found a flat elsewhere"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let request_id = res.headers()["x-request-id"]
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["meta"]["request_id"], request_id.as_str());
    let request = &body["data"]["request"];
    assert_eq!(request["status"], "pending_verification");
    assert_eq!(request["subject_type"], "renter");
    assert_eq!(request["subject_id"], subject_id.to_string());

    let raw = body.to_string();
    assert!(!raw.contains("token"));
}

#[tokio::test]
async fn test_public_create_cannot_skip_grace_period() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;

    let res = harness
        .router()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({
                "subject_id": subject_id,
                "subject_type": "renter",
                "skip_grace_period": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_create_error_statuses() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Landlord).await;
    let app = harness.router();

    let unknown = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({ "subject_id": Uuid::new_v4(), "subject_type": "landlord" }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body = body_json(unknown).await;
    assert_eq!(body["error_type"], "subject_not_found");

    let too_long = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({
                "subject_id": subject_id,
                "subject_type": "landlord",
                "reason": "x".repeat(1001)
            }),
        ))
        .await
        .unwrap();
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);

    let first = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({ "subject_id": subject_id, "subject_type": "landlord" }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let duplicate = app
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({ "subject_id": subject_id, "subject_type": "landlord" }),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let body = body_json(duplicate).await;
    assert_eq!(body["error_type"], "duplicate_request");
}

#[tokio::test]
async fn test_verify_and_cancel_through_api() {
    let harness = TestHarness::new();
    let subject_id = seed_subject(&harness.records, SubjectType::Renter).await;
    let app = harness.router();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/requests",
            &json!({ "subject_id": subject_id, "subject_type": "renter" }),
        ))
        .await
        .unwrap();
    let request_id = body_json(res).await["data"]["request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // 通知タスクの完了を待つ
    let links = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(links) = harness.notifier.sent().into_iter().next() {
                break links;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("notification was never sent");

    let verified = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/verify",
            &json!({ "token": links.verify_token }),
        ))
        .await
        .unwrap();
    assert_eq!(verified.status(), StatusCode::OK);
    let body = body_json(verified).await;
    assert_eq!(body["data"]["status"], "verified");
    assert!(body["data"]["verified_at"].is_string());

    let replay = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/verify",
            &json!({ "token": links.verify_token }),
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(replay).await["error_type"], "invalid_token");

    let cancelled = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/erasure/cancel",
            &json!({ "token": links.cancel_token }),
        ))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), StatusCode::OK);

    let status = app
        .oneshot(get_request(&format!("/erasure/requests/{}", request_id)))
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let body = body_json(status).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert!(body["data"].get("verification_token_hash").is_none());
    assert!(body["data"].get("cancellation_token_hash").is_none());
}

#[tokio::test]
async fn test_empty_token_is_rejected() {
    let harness = TestHarness::new();

    let res = harness
        .router()
        .oneshot(json_request("POST", "/erasure/verify", &json!({ "token": "" })))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_request_returns_not_found() {
    let harness = TestHarness::new();

    let res = harness
        .router()
        .oneshot(get_request(&format!("/erasure/requests/{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
