// src/repository/deletion_request_repository.rs

use crate::db::DbPool;
use crate::domain::deletion_request_model::{
    ActiveModel, Column, DeletionRequest, DeletionStatus, Entity, NewDeletionRequest,
    RequestSelector, StatusTransition,
};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr,
};
use uuid::Uuid;

/// Persistence of deletion requests.
///
/// Every status change goes through [`DeletionRequestStore::apply`], which is a
/// conditional update: it succeeds only if the row is still in one of the
/// transition's source statuses, so concurrent callers never both win.
#[async_trait]
pub trait DeletionRequestStore: Send + Sync {
    /// Inserts a new `pending_verification` request. Fails with
    /// `DuplicateRequest` if the subject already has a non-terminal request.
    async fn insert(&self, request: NewDeletionRequest) -> AppResult<DeletionRequest>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeletionRequest>>;

    async fn find_active_by_subject(&self, subject_id: Uuid)
        -> AppResult<Option<DeletionRequest>>;

    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Vec<DeletionRequest>>;

    /// `verified` requests with `scheduled_deletion_at <= now`, oldest first.
    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<DeletionRequest>>;

    /// `processing` requests claimed before `claimed_before`.
    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> AppResult<Vec<DeletionRequest>>;

    /// Applies a compare-and-swap transition. `Ok(None)` means no row matched
    /// the selector in an allowed source status.
    async fn apply(
        &self,
        selector: RequestSelector,
        transition: StatusTransition,
    ) -> AppResult<Option<DeletionRequest>>;
}

#[derive(Clone)]
pub struct DeletionRequestRepository {
    db: DbPool,
}

impl DeletionRequestRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

/// 部分ユニークインデックス違反を重複リクエストとして扱う
fn map_unique_violation(err: DbErr, subject_id: Uuid) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateRequest(subject_id),
        _ => AppError::DbErr(err),
    }
}

#[async_trait]
impl DeletionRequestStore for DeletionRequestRepository {
    async fn insert(&self, request: NewDeletionRequest) -> AppResult<DeletionRequest> {
        let subject_id = request.subject_id;
        let model = request.into_model();

        let active = ActiveModel {
            id: Set(model.id),
            subject_id: Set(model.subject_id),
            subject_type: Set(model.subject_type),
            status: Set(model.status),
            requested_at: Set(model.requested_at),
            verified_at: Set(None),
            scheduled_deletion_at: Set(model.scheduled_deletion_at),
            processing_started_at: Set(None),
            executed_at: Set(None),
            verification_token_hash: Set(model.verification_token_hash),
            cancellation_token_hash: Set(model.cancellation_token_hash),
            reason: Set(model.reason),
            last_error: Set(None),
            attempts: Set(0),
            updated_at: Set(model.updated_at),
        };

        active
            .insert(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, subject_id))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeletionRequest>> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_active_by_subject(
        &self,
        subject_id: Uuid,
    ) -> AppResult<Option<DeletionRequest>> {
        let request = Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .filter(
                Column::Status.is_in(DeletionStatus::NON_TERMINAL.iter().map(|s| s.as_str())),
            )
            .one(&self.db)
            .await?;

        Ok(request)
    }

    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Vec<DeletionRequest>> {
        let requests = Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .order_by_desc(Column::RequestedAt)
            .all(&self.db)
            .await?;

        Ok(requests)
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<DeletionRequest>> {
        let requests = Entity::find()
            .filter(Column::Status.eq(DeletionStatus::Verified.as_str()))
            .filter(Column::ScheduledDeletionAt.lte(now))
            .order_by_asc(Column::ScheduledDeletionAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(requests)
    }

    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> AppResult<Vec<DeletionRequest>> {
        let requests = Entity::find()
            .filter(Column::Status.eq(DeletionStatus::Processing.as_str()))
            .filter(Column::ProcessingStartedAt.lt(claimed_before))
            .order_by_asc(Column::ProcessingStartedAt)
            .all(&self.db)
            .await?;

        Ok(requests)
    }

    async fn apply(
        &self,
        selector: RequestSelector,
        transition: StatusTransition,
    ) -> AppResult<Option<DeletionRequest>> {
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(transition.to.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(transition.at));

        if let Some(at) = transition.verified_at {
            update = update.col_expr(Column::VerifiedAt, Expr::value(at));
        }
        if let Some(at) = transition.executed_at {
            update = update.col_expr(Column::ExecutedAt, Expr::value(at));
        }
        if let Some(at) = transition.processing_started_at {
            update = update.col_expr(Column::ProcessingStartedAt, Expr::value(at));
        }
        if let Some(at) = transition.scheduled_deletion_at {
            update = update.col_expr(Column::ScheduledDeletionAt, Expr::value(at));
        }
        if let Some(error) = &transition.last_error {
            update = update.col_expr(Column::LastError, Expr::value(error.clone()));
        } else if transition.clear_last_error {
            update = update.col_expr(Column::LastError, Expr::value(Option::<String>::None));
        }
        if transition.consume_verification_token {
            update = update.col_expr(
                Column::VerificationTokenHash,
                Expr::value(Option::<String>::None),
            );
        }
        if transition.consume_cancellation_token {
            update = update.col_expr(
                Column::CancellationTokenHash,
                Expr::value(Option::<String>::None),
            );
        }
        if transition.increment_attempts {
            update = update.col_expr(Column::Attempts, Expr::col(Column::Attempts).add(1));
        }

        update = match &selector {
            RequestSelector::Id(id) => update.filter(Column::Id.eq(*id)),
            RequestSelector::VerificationTokenHash(hash) => {
                update.filter(Column::VerificationTokenHash.eq(hash.as_str()))
            }
            RequestSelector::CancellationTokenHash(hash) => {
                update.filter(Column::CancellationTokenHash.eq(hash.as_str()))
            }
        };
        update = update.filter(Column::Status.is_in(transition.from.iter().map(|s| s.as_str())));
        if let Some(cutoff) = transition.claimed_before {
            update = update.filter(Column::ProcessingStartedAt.lt(cutoff));
        }
        if let Some(attempts) = transition.claim_attempt {
            update = update.filter(Column::Attempts.eq(attempts));
        }

        // 再キュー時は部分ユニークインデックスに触れる可能性がある
        let updated = update
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                    "Subject already has an open deletion request".to_string(),
                ),
                _ => AppError::DbErr(e),
            })?;

        Ok(updated.into_iter().next())
    }
}
