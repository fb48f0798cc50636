// src/api/handlers/system_handler.rs

use crate::api::AppState;
use crate::config::StoreBackend;
use crate::logging::RequestContext;
use crate::types::ApiResponse;
use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub store_backend: String,
    pub scheduler_enabled: bool,
}

pub async fn health_handler(
    State(app_state): State<AppState>,
    context: RequestContext,
) -> ApiResponse<HealthResponse> {
    let config = &app_state.config;
    let store_backend = match config.store_backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };

    ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        environment: config.environment.clone(),
        store_backend: store_backend.to_string(),
        scheduler_enabled: config.erasure.scheduler_enabled,
    })
    .with_context(&context)
}

pub fn system_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_state)
}
