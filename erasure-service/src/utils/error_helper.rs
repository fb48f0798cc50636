// src/utils/error_helper.rs

//! エラーハンドリングの共通ヘルパー

use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// リソース未発見エラーをログ付きで生成
pub fn not_found_error(resource: &str, identifier: &str, context: &str) -> AppError {
    warn!(
        context = %context,
        resource = %resource,
        identifier = %identifier,
        "Resource not found"
    );
    AppError::NotFound(format!(
        "{} with identifier {} not found",
        resource, identifier
    ))
}

/// 競合エラーをログ付きで生成
pub fn conflict_error(message: &str, context: &str) -> AppError {
    warn!(
        context = %context,
        message = %message,
        "Resource conflict occurred"
    );
    AppError::Conflict(message.to_string())
}

/// Bounds a backend call. Elapsed deadlines become `AppError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, context: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                context = %context,
                timeout_ms = limit.as_millis() as u64,
                "Backend call timed out"
            );
            Err(AppError::Timeout(context.to_string()))
        }
    }
}
