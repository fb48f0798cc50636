// src/api/handlers/erasure_handler.rs

use crate::api::dto::erasure_dto::{
    CreateDeletionRequest, CreateDeletionResponse, DeletionRequestResponse, TokenRequest,
};
use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::service::erasure_lifecycle_service::RequestDeletionOptions;
use crate::logging::RequestContext;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

/// Create an erasure request. The grace period always applies here.
pub async fn create_deletion_request_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    Json(payload): Json<CreateDeletionRequest>,
) -> AppResult<ApiResponse<CreateDeletionResponse>> {
    payload.validate()?;

    if payload.skip_grace_period == Some(true) {
        return Err(AppError::Forbidden(
            "The grace period can only be skipped by an operator".to_string(),
        ));
    }

    let created = app_state
        .lifecycle
        .request_deletion(
            payload.subject_id,
            payload.subject_type,
            RequestDeletionOptions {
                skip_grace_period: false,
                reason: payload.reason,
            },
        )
        .await?;

    Ok(ApiResponse::created(CreateDeletionResponse {
        request: created.request.into(),
        message: "Check your inbox to confirm the erasure request".to_string(),
    })
    .with_context(&context))
}

pub async fn verify_deletion_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    Json(payload): Json<TokenRequest>,
) -> AppResult<ApiResponse<DeletionRequestResponse>> {
    payload.validate()?;
    let request = app_state.lifecycle.verify_deletion(&payload.token).await?;
    Ok(ApiResponse::success(request.into()).with_context(&context))
}

pub async fn cancel_deletion_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    Json(payload): Json<TokenRequest>,
) -> AppResult<ApiResponse<DeletionRequestResponse>> {
    payload.validate()?;
    let request = app_state.lifecycle.cancel_deletion(&payload.token).await?;
    Ok(ApiResponse::success(request.into()).with_context(&context))
}

pub async fn get_deletion_request_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
    Path(request_id): Path<Uuid>,
) -> AppResult<ApiResponse<DeletionRequestResponse>> {
    let request = app_state.lifecycle.get_request(request_id).await?;
    Ok(ApiResponse::success(request.into()).with_context(&context))
}

pub fn erasure_router(app_state: AppState) -> Router {
    Router::new()
        .route("/erasure/requests", post(create_deletion_request_handler))
        .route("/erasure/requests/{id}", get(get_deletion_request_handler))
        .route("/erasure/verify", post(verify_deletion_handler))
        .route("/erasure/cancel", post(cancel_deletion_handler))
        .with_state(app_state)
}
