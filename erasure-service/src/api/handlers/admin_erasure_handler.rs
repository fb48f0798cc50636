// src/api/handlers/admin_erasure_handler.rs

use crate::api::dto::erasure_dto::{
    AdminCreateDeletionRequest, AdminDeletionRequestResponse, BatchRunResponse,
    CreateDeletionResponse, StaleRecoveryResponse,
};
use crate::api::AppState;
use crate::error::AppResult;
use crate::middleware::admin_auth::OperatorAuth;
use crate::logging::RequestContext;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Operator create; may skip the grace period.
pub async fn admin_create_deletion_request_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    _operator: OperatorAuth,
    Json(payload): Json<AdminCreateDeletionRequest>,
) -> AppResult<ApiResponse<CreateDeletionResponse>> {
    payload.validate()?;

    let created = app_state
        .lifecycle
        .request_deletion(payload.subject_id, payload.subject_type, payload.options())
        .await?;

    info!(
        request_id = %created.request.id,
        skip_grace_period = payload.skip_grace_period,
        "Operator created deletion request"
    );

    Ok(ApiResponse::created(CreateDeletionResponse {
        request: created.request.into(),
        message: "Verification links sent to the subject".to_string(),
    })
    .with_context(&context))
}

pub async fn run_batch_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    _operator: OperatorAuth,
) -> AppResult<ApiResponse<BatchRunResponse>> {
    let results = app_state
        .batch_runner
        .execute_pending_deletions(Utc::now())
        .await?;
    Ok(ApiResponse::success(results.into()).with_context(&context))
}

pub async fn requeue_deletion_request_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    _operator: OperatorAuth,
    Path(request_id): Path<Uuid>,
) -> AppResult<ApiResponse<AdminDeletionRequestResponse>> {
    let request = app_state
        .lifecycle
        .requeue_failed(request_id, Utc::now())
        .await?;
    Ok(ApiResponse::success(request.into()).with_context(&context))
}

pub async fn recover_stale_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    _operator: OperatorAuth,
) -> AppResult<ApiResponse<StaleRecoveryResponse>> {
    let recovered = app_state.lifecycle.recover_stale(Utc::now()).await?;
    Ok(ApiResponse::success(StaleRecoveryResponse {
        recovered: recovered.len(),
        request_ids: recovered.iter().map(|r| r.id).collect(),
    })
    .with_context(&context))
}

pub fn admin_erasure_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/admin/erasure/requests",
            post(admin_create_deletion_request_handler),
        )
        .route("/admin/erasure/run", post(run_batch_handler))
        .route(
            "/admin/erasure/requests/{id}/requeue",
            post(requeue_deletion_request_handler),
        )
        .route("/admin/erasure/recover-stale", post(recover_stale_handler))
        .with_state(app_state)
}
