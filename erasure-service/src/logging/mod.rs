// src/logging/mod.rs

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[macro_export]
macro_rules! log_with_context {
    ($level:expr, $msg:expr $(, $($key:expr => $value:expr),* $(,)?)?) => {
        match $level {
            tracing::Level::ERROR => {
                tracing::error!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::WARN => {
                tracing::warn!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::INFO => {
                tracing::info!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::DEBUG => {
                tracing::debug!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            _ => {}
        }
    };
}

// リクエストコンテキスト
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
    pub method: String,
}

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Handlers read the context the middleware inserted; without the middleware
/// it is rebuilt from the request itself.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<RequestContext>() {
            return Ok(context.clone());
        }
        Ok(RequestContext {
            request_id: resolve_request_id(&parts.headers),
            path: parts.uri.path().to_string(),
            method: parts.method.to_string(),
        })
    }
}

// RequestContextを生成するミドルウェア（上流のリクエストIDがあれば引き継ぐ）
pub async fn inject_request_context(mut req: Request<Body>, next: Next) -> Response {
    let request_id = resolve_request_id(req.headers());

    let context = RequestContext {
        request_id: request_id.clone(),
        path: req.uri().path().to_string(),
        method: req.method().to_string(),
    };

    req.extensions_mut().insert(context);
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// ロギングミドルウェア
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let context = req.extensions().get::<RequestContext>().cloned();

    if let Some(context) = &context {
        log_with_context!(
            tracing::Level::DEBUG,
            "Request started",
            "request_id" => &context.request_id,
            "method" => &context.method,
            "path" => &context.path,
        );
    }

    let response = next.run(req).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();

    if let Some(context) = &context {
        log_with_context!(
            if status >= 500 { tracing::Level::ERROR }
            else if status >= 400 { tracing::Level::WARN }
            else { tracing::Level::INFO },
            "Request completed",
            "request_id" => &context.request_id,
            "method" => &context.method,
            "path" => &context.path,
            "status" => status,
            "duration_ms" => duration.as_millis(),
        );
    }

    response
}
