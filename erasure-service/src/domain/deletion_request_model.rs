// src/domain/deletion_request_model.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::subject::SubjectType;

/// Lifecycle status of a deletion request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    #[sea_orm(string_value = "pending_verification")]
    PendingVerification,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DeletionStatus {
    /// 同一サブジェクトで同時に1件しか存在できないステータス
    pub const NON_TERMINAL: [DeletionStatus; 3] = [
        DeletionStatus::PendingVerification,
        DeletionStatus::Verified,
        DeletionStatus::Processing,
    ];

    pub fn is_terminal(&self) -> bool {
        !Self::NON_TERMINAL.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::PendingVerification => "pending_verification",
            DeletionStatus::Verified => "verified",
            DeletionStatus::Processing => "processing",
            DeletionStatus::Completed => "completed",
            DeletionStatus::Failed => "failed",
            DeletionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deletion_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub status: DeletionStatus,
    pub requested_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub scheduled_deletion_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub verification_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub cancellation_token_hash: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
    pub attempts: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 削除リクエスト（永続化レコードそのもの）
pub type DeletionRequest = Model;

impl Model {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 猶予期間が過ぎて実行対象かどうか
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DeletionStatus::Verified && self.scheduled_deletion_at <= now
    }
}

/// 削除リクエスト作成用の構造体
#[derive(Debug, Clone)]
pub struct NewDeletionRequest {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub requested_at: DateTime<Utc>,
    pub scheduled_deletion_at: DateTime<Utc>,
    pub verification_token_hash: String,
    pub cancellation_token_hash: String,
    pub reason: Option<String>,
}

impl NewDeletionRequest {
    pub fn into_model(self) -> Model {
        Model {
            id: Uuid::new_v4(),
            subject_id: self.subject_id,
            subject_type: self.subject_type,
            status: DeletionStatus::PendingVerification,
            requested_at: self.requested_at,
            verified_at: None,
            scheduled_deletion_at: self.scheduled_deletion_at,
            processing_started_at: None,
            executed_at: None,
            verification_token_hash: Some(self.verification_token_hash),
            cancellation_token_hash: Some(self.cancellation_token_hash),
            reason: self.reason,
            last_error: None,
            attempts: 0,
            updated_at: self.requested_at,
        }
    }
}

/// Which row a conditional transition targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSelector {
    Id(Uuid),
    VerificationTokenHash(String),
    CancellationTokenHash(String),
}

impl RequestSelector {
    pub fn matches(&self, model: &Model) -> bool {
        match self {
            RequestSelector::Id(id) => model.id == *id,
            RequestSelector::VerificationTokenHash(hash) => {
                model.verification_token_hash.as_deref() == Some(hash.as_str())
            }
            RequestSelector::CancellationTokenHash(hash) => {
                model.cancellation_token_hash.as_deref() == Some(hash.as_str())
            }
        }
    }
}

/// A compare-and-swap status change. Stores apply it only when the current
/// status is one of `from`. Stale recovery additionally needs an old enough
/// claim, and finishing a run needs the claim it started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: &'static [DeletionStatus],
    pub to: DeletionStatus,
    pub at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub scheduled_deletion_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub clear_last_error: bool,
    pub consume_verification_token: bool,
    pub consume_cancellation_token: bool,
    pub increment_attempts: bool,
    pub claimed_before: Option<DateTime<Utc>>,
    /// `attempts` value the caller's claim produced.
    pub claim_attempt: Option<i32>,
}

impl StatusTransition {
    fn new(from: &'static [DeletionStatus], to: DeletionStatus, at: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            at,
            verified_at: None,
            executed_at: None,
            processing_started_at: None,
            scheduled_deletion_at: None,
            last_error: None,
            clear_last_error: false,
            consume_verification_token: false,
            consume_cancellation_token: false,
            increment_attempts: false,
            claimed_before: None,
            claim_attempt: None,
        }
    }

    /// Restricts the transition to the claim that set `attempts`, so a run
    /// that was recovered as stale cannot finish a newer claim.
    pub fn for_claim(self, attempts: i32) -> Self {
        Self {
            claim_attempt: Some(attempts),
            ..self
        }
    }

    /// pending_verification → verified
    pub fn verify(now: DateTime<Utc>) -> Self {
        Self {
            verified_at: Some(now),
            consume_verification_token: true,
            ..Self::new(
                &[DeletionStatus::PendingVerification],
                DeletionStatus::Verified,
                now,
            )
        }
    }

    /// pending_verification | verified → cancelled
    pub fn cancel(now: DateTime<Utc>) -> Self {
        Self {
            consume_verification_token: true,
            consume_cancellation_token: true,
            ..Self::new(
                &[DeletionStatus::PendingVerification, DeletionStatus::Verified],
                DeletionStatus::Cancelled,
                now,
            )
        }
    }

    /// verified → processing
    pub fn claim(now: DateTime<Utc>) -> Self {
        Self {
            processing_started_at: Some(now),
            consume_cancellation_token: true,
            increment_attempts: true,
            ..Self::new(&[DeletionStatus::Verified], DeletionStatus::Processing, now)
        }
    }

    /// processing → completed
    pub fn complete(now: DateTime<Utc>) -> Self {
        Self {
            executed_at: Some(now),
            ..Self::new(&[DeletionStatus::Processing], DeletionStatus::Completed, now)
        }
    }

    /// processing → failed
    pub fn fail(now: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::new(&[DeletionStatus::Processing], DeletionStatus::Failed, now)
        }
    }

    /// failed → verified (operator re-queue)
    pub fn requeue(now: DateTime<Utc>) -> Self {
        Self {
            scheduled_deletion_at: Some(now),
            clear_last_error: true,
            ..Self::new(&[DeletionStatus::Failed], DeletionStatus::Verified, now)
        }
    }

    /// processing → verified when the claim is older than `claimed_before`
    pub fn release_stale(now: DateTime<Utc>, claimed_before: DateTime<Utc>) -> Self {
        Self {
            claimed_before: Some(claimed_before),
            ..Self::new(&[DeletionStatus::Processing], DeletionStatus::Verified, now)
        }
    }

    /// 現在の状態に対して遷移が許可されるか
    pub fn permits(&self, model: &Model) -> bool {
        if !self.from.contains(&model.status) {
            return false;
        }
        if self
            .claim_attempt
            .is_some_and(|attempts| attempts != model.attempts)
        {
            return false;
        }
        match self.claimed_before {
            Some(cutoff) => model
                .processing_started_at
                .is_some_and(|started| started < cutoff),
            None => true,
        }
    }

    /// Applies the field changes to an in-memory record.
    pub fn apply_to(&self, model: &mut Model) {
        model.status = self.to;
        model.updated_at = self.at;
        if let Some(at) = self.verified_at {
            model.verified_at = Some(at);
        }
        if let Some(at) = self.executed_at {
            model.executed_at = Some(at);
        }
        if let Some(at) = self.processing_started_at {
            model.processing_started_at = Some(at);
        }
        if let Some(at) = self.scheduled_deletion_at {
            model.scheduled_deletion_at = at;
        }
        if let Some(error) = &self.last_error {
            model.last_error = Some(error.clone());
        } else if self.clear_last_error {
            model.last_error = None;
        }
        if self.consume_verification_token {
            model.verification_token_hash = None;
        }
        if self.consume_cancellation_token {
            model.cancellation_token_hash = None;
        }
        if self.increment_attempts {
            model.attempts += 1;
        }
    }
}
