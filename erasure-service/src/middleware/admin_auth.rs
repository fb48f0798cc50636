// src/middleware/admin_auth.rs

use crate::api::AppState;
use crate::error::AppError;
use crate::service::token_issuer::hash_token;
use axum::http::{header, request::Parts, HeaderMap};
use tracing::warn;

/// 運用者ルート用の Bearer トークン認証
#[derive(Debug, Clone, Copy)]
pub struct OperatorAuth;

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl axum::extract::FromRequestParts<AppState> for OperatorAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer(&parts.headers) else {
            return Err(AppError::Unauthorized(
                "Operator token required".to_string(),
            ));
        };

        // ダイジェスト同士で比較する
        if hash_token(token) != hash_token(&state.config.admin_api_token) {
            warn!(path = %parts.uri.path(), "Rejected operator token");
            return Err(AppError::Forbidden("Invalid operator token".to_string()));
        }

        Ok(OperatorAuth)
    }
}
