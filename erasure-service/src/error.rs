// src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::domain::subject::SubjectType;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Subject not found: {subject_type} {subject_id}")]
    SubjectNotFound {
        subject_id: Uuid,
        subject_type: SubjectType,
    },

    #[error("A deletion request is already open for subject {0}")]
    DuplicateRequest(Uuid),

    #[error("Invalid or already used token")]
    InvalidToken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    ValidationFailure(#[from] ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::DbErr(DbErr::RecordNotFound(_)) => (StatusCode::NOT_FOUND, "database_error"),
            AppError::DbErr(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::SubjectNotFound { .. } => (StatusCode::NOT_FOUND, "subject_not_found"),
            AppError::DuplicateRequest(_) => (StatusCode::CONFLICT, "duplicate_request"),
            AppError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid_token"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::ValidationFailure(_) => (StatusCode::BAD_REQUEST, "validation_errors"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        }
    }
}

// axum でエラーをHTTPレスポンスに変換するための実装
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let (message, details, validation_errors) = match &self {
            AppError::DbErr(db_err) => {
                // サーバーログには詳細を出す
                tracing::error!(error = ?db_err, "Database error");
                let details = match db_err {
                    DbErr::RecordNotFound(entity) => Some(json!({ "entity": entity })),
                    DbErr::Exec(_) => Some(json!({ "operation": "exec" })),
                    DbErr::Query(_) => Some(json!({ "operation": "query" })),
                    _ => None,
                };
                ("A database error occurred".to_string(), details, None)
            }
            AppError::SubjectNotFound {
                subject_id,
                subject_type,
            } => (
                self.to_string(),
                Some(json!({ "subject_id": subject_id, "subject_type": subject_type })),
                None,
            ),
            AppError::DuplicateRequest(subject_id) => (
                self.to_string(),
                Some(json!({ "subject_id": subject_id })),
                None,
            ),
            AppError::ValidationFailure(errors) => {
                let field_errors: HashMap<String, Vec<String>> = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, errors)| {
                        let messages = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map_or_else(|| "Invalid value".to_string(), |m| m.to_string())
                            })
                            .collect();
                        (field.to_string(), messages)
                    })
                    .collect();
                ("Validation failed".to_string(), None, Some(field_errors))
            }
            AppError::Timeout(message) => {
                tracing::warn!(error = %message, "Operation timed out");
                (self.to_string(), None, None)
            }
            _ => (self.to_string(), None, None),
        };

        let body = ErrorResponse {
            success: false,
            error: message.clone(),
            message,
            details,
            validation_errors,
            error_type: error_type.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;

/// 統一的なエラーレスポンス構造
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, Vec<String>>>,
    pub error_type: String,
}
