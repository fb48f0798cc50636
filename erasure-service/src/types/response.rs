use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::logging::RequestContext;

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip)]
    status: Option<u16>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    /// `request_id` は `x-request-id` ヘッダーと同じ値
    pub fn from_context(context: &RequestContext) -> Self {
        Self {
            request_id: context.request_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: None,
            status: None,
        }
    }

    /// Attaches the request's correlation id and a timestamp.
    pub fn with_context(self, context: &RequestContext) -> Self {
        Self {
            meta: Some(ResponseMeta::from_context(context)),
            ..self
        }
    }

    /// 201 Created で返す
    pub fn created(data: T) -> Self {
        Self {
            status: Some(StatusCode::CREATED.as_u16()),
            ..Self::success(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self
            .status
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
