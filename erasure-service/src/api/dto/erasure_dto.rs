// src/api/dto/erasure_dto.rs

use crate::domain::deletion_request_model::{DeletionRequest, DeletionStatus};
use crate::domain::subject::SubjectType;
use crate::service::erasure_batch_runner::DeletionResult;
use crate::service::erasure_lifecycle_service::RequestDeletionOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// --- Requests ---

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateDeletionRequest {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,

    #[validate(length(max = 1000, message = "Reason cannot exceed 1000 characters"))]
    pub reason: Option<String>,

    /// 公開エンドポイントでは true を受け付けない
    #[serde(default)]
    pub skip_grace_period: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminCreateDeletionRequest {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,

    #[validate(length(max = 1000, message = "Reason cannot exceed 1000 characters"))]
    pub reason: Option<String>,

    #[serde(default)]
    pub skip_grace_period: bool,
}

impl AdminCreateDeletionRequest {
    pub fn options(&self) -> RequestDeletionOptions {
        RequestDeletionOptions {
            skip_grace_period: self.skip_grace_period,
            reason: self.reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 128, message = "Token must be 1-128 characters"))]
    pub token: String,
}

// --- Responses ---

/// Public view of a request. Token hashes and failure details are never part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRequestResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub status: DeletionStatus,
    pub requested_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub scheduled_deletion_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
}

impl From<DeletionRequest> for DeletionRequestResponse {
    fn from(request: DeletionRequest) -> Self {
        Self {
            id: request.id,
            subject_id: request.subject_id,
            subject_type: request.subject_type,
            status: request.status,
            requested_at: request.requested_at,
            verified_at: request.verified_at,
            scheduled_deletion_at: request.scheduled_deletion_at,
            processing_started_at: request.processing_started_at,
            executed_at: request.executed_at,
            attempts: request.attempts,
        }
    }
}

/// Operator view. Adds the last cascade failure to the public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDeletionRequestResponse {
    #[serde(flatten)]
    pub request: DeletionRequestResponse,
    pub last_error: Option<String>,
}

impl From<DeletionRequest> for AdminDeletionRequestResponse {
    fn from(request: DeletionRequest) -> Self {
        let last_error = request.last_error.clone();
        Self {
            request: request.into(),
            last_error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeletionResponse {
    pub request: DeletionRequestResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRunResponse {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<DeletionResult>,
}

impl From<Vec<DeletionResult>> for BatchRunResponse {
    fn from(results: Vec<DeletionResult>) -> Self {
        let completed = results
            .iter()
            .filter(|r| r.status == DeletionStatus::Completed)
            .count();
        Self {
            processed: results.len(),
            completed,
            failed: results.len() - completed,
            results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleRecoveryResponse {
    pub recovered: usize,
    pub request_ids: Vec<Uuid>,
}
