// src/service/erasure_batch_runner.rs

use crate::config::ErasureConfig;
use crate::domain::deletion_request_model::{
    DeletionRequest, DeletionStatus, RequestSelector, StatusTransition,
};
use crate::domain::erasure_audit_event_model::{AuditEventKind, ErasureAuditEvent};
use crate::domain::subject::SubjectType;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::deletion_request_repository::DeletionRequestStore;
use crate::service::audit_sink::AuditSink;
use crate::service::cascade_executor::{CascadeExecutor, CascadeReport};
use crate::utils::error_helper::with_timeout;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one claimed request within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionResult {
    pub request_id: Uuid,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub status: DeletionStatus,
    pub tables_affected: Vec<String>,
    pub rows_deleted: u64,
    pub rows_anonymized: u64,
    pub errors: Vec<String>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl DeletionResult {
    fn new(request: &DeletionRequest, report: &CascadeReport) -> Self {
        Self {
            request_id: request.id,
            subject_id: request.subject_id,
            subject_type: request.subject_type,
            status: DeletionStatus::Processing,
            tables_affected: report
                .tables_affected()
                .into_iter()
                .map(str::to_string)
                .collect(),
            rows_deleted: report.rows_deleted,
            rows_anonymized: report.rows_anonymized,
            errors: report
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.collection, e.message))
                .collect(),
            executed_at: None,
        }
    }
}

/// Claims due requests one at a time and drives each through the cascade.
pub struct ErasureBatchRunner {
    store: Arc<dyn DeletionRequestStore>,
    executor: CascadeExecutor,
    audit: Arc<dyn AuditSink>,
    config: ErasureConfig,
}

impl ErasureBatchRunner {
    pub fn new(
        store: Arc<dyn DeletionRequestStore>,
        executor: CascadeExecutor,
        audit: Arc<dyn AuditSink>,
        config: ErasureConfig,
    ) -> Self {
        Self {
            store,
            executor,
            audit,
            config,
        }
    }

    /// Processes every `verified` request whose grace period has elapsed at
    /// `now`, up to `batch_size`. Requests claimed by a concurrent run are
    /// skipped and do not appear in the result.
    pub async fn execute_pending_deletions(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DeletionResult>> {
        let due = with_timeout(
            self.config.db_timeout(),
            "due request lookup",
            self.store.find_due(now, self.config.batch_size),
        )
        .await?;

        if due.is_empty() {
            log_with_context!(tracing::Level::DEBUG, "No deletion requests due");
            return Ok(Vec::new());
        }

        log_with_context!(
            tracing::Level::INFO,
            "Starting erasure batch",
            "due" => due.len(),
            "now" => now
        );

        let mut results = Vec::with_capacity(due.len());
        for request in due {
            if let Some(result) = self.process_request(request, now).await {
                results.push(result);
            }
        }

        let completed = results
            .iter()
            .filter(|r| r.status == DeletionStatus::Completed)
            .count();
        log_with_context!(
            tracing::Level::INFO,
            "Erasure batch finished",
            "processed" => results.len(),
            "completed" => completed,
            "failed" => results.len() - completed
        );

        Ok(results)
    }

    async fn process_request(
        &self,
        request: DeletionRequest,
        now: DateTime<Utc>,
    ) -> Option<DeletionResult> {
        let claimed = with_timeout(
            self.config.db_timeout(),
            "claim transition",
            self.store
                .apply(RequestSelector::Id(request.id), StatusTransition::claim(now)),
        )
        .await;

        let claimed = match claimed {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                log_with_context!(
                    tracing::Level::DEBUG,
                    "Deletion request already claimed or cancelled, skipping",
                    "request_id" => request.id
                );
                return None;
            }
            Err(e) => {
                // 未取得のまま verified に残るので次回のバッチで再試行される
                log_with_context!(
                    tracing::Level::ERROR,
                    "Failed to claim deletion request",
                    "request_id" => request.id,
                    "error" => e.to_string()
                );
                return None;
            }
        };

        self.record_audit(
            ErasureAuditEvent::for_request(&claimed, AuditEventKind::Claimed, now)
                .with_details(json!({ "attempts": claimed.attempts })),
        )
        .await;

        let report = self
            .executor
            .execute_for(claimed.subject_id, claimed.subject_type)
            .await;
        let mut result = DeletionResult::new(&claimed, &report);

        let transition = if report.all_failed() {
            StatusTransition::fail(now, format!("all collections failed: {}", result.errors.join("; ")))
        } else {
            StatusTransition::complete(now)
        }
        .for_claim(claimed.attempts);

        let finished = with_timeout(
            self.config.db_timeout(),
            "finish transition",
            self.store
                .apply(RequestSelector::Id(claimed.id), transition),
        )
        .await;

        match finished {
            Ok(Some(updated)) => {
                result.status = updated.status;
                result.executed_at = updated.executed_at;
            }
            Ok(None) => {
                // ステール回復で戻された、または別の実行が再取得している
                let message = "request was no longer processing when the cascade finished";
                log_with_context!(
                    tracing::Level::WARN,
                    "Lost deletion request before finishing",
                    "request_id" => claimed.id
                );
                result.status = DeletionStatus::Failed;
                result.errors.push(message.to_string());
            }
            Err(e) => {
                log_with_context!(
                    tracing::Level::ERROR,
                    "Failed to record deletion outcome, marking request failed",
                    "request_id" => claimed.id,
                    "error" => e.to_string()
                );
                let fallback = self
                    .store
                    .apply(
                        RequestSelector::Id(claimed.id),
                        StatusTransition::fail(now, e.to_string()).for_claim(claimed.attempts),
                    )
                    .await;
                if let Err(fallback_err) = fallback {
                    log_with_context!(
                        tracing::Level::ERROR,
                        "Failed to mark deletion request failed",
                        "request_id" => claimed.id,
                        "error" => fallback_err.to_string()
                    );
                }
                result.status = DeletionStatus::Failed;
                result.errors.push(e.to_string());
            }
        }

        let kind = if result.status == DeletionStatus::Completed {
            AuditEventKind::Completed
        } else {
            AuditEventKind::Failed
        };
        log_with_context!(
            tracing::Level::INFO,
            "Deletion request processed",
            "request_id" => claimed.id,
            "subject_id" => claimed.subject_id,
            "status" => result.status,
            "rows_deleted" => result.rows_deleted,
            "rows_anonymized" => result.rows_anonymized,
            "errors" => result.errors.len()
        );
        self.record_audit(
            ErasureAuditEvent::for_request(&claimed, kind, now).with_details(json!({
                "tables_affected": &result.tables_affected,
                "rows_deleted": result.rows_deleted,
                "rows_anonymized": result.rows_anonymized,
                "errors": &result.errors,
            })),
        )
        .await;

        Some(result)
    }

    async fn record_audit(&self, event: ErasureAuditEvent) {
        let kind = event.kind;
        if let Err(e) = self.audit.record(event).await {
            log_with_context!(
                tracing::Level::ERROR,
                "Failed to record audit event",
                "kind" => kind,
                "error" => e.to_string()
            );
        }
    }
}
