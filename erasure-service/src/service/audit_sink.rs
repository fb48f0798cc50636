// src/service/audit_sink.rs

use crate::domain::erasure_audit_event_model::ErasureAuditEvent;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::erasure_audit_event_repository::ErasureAuditEventRepository;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives every lifecycle transition and execution outcome.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: ErasureAuditEvent) -> AppResult<()>;
}

/// 構造化ログとして監査イベントを出力する
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: ErasureAuditEvent) -> AppResult<()> {
        log_with_context!(
            tracing::Level::INFO,
            "Erasure audit event",
            "kind" => event.kind,
            "request_id" => event.request_id,
            "subject_id" => event.subject_id,
            "subject_type" => event.subject_type,
            "details" => &event.details,
            "occurred_at" => event.occurred_at
        );
        Ok(())
    }
}

/// Persists audit events into `erasure_audit_events`.
pub struct DbAuditSink {
    repo: Arc<ErasureAuditEventRepository>,
}

impl DbAuditSink {
    pub fn new(repo: Arc<ErasureAuditEventRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn record(&self, event: ErasureAuditEvent) -> AppResult<()> {
        self.repo.create(event).await?;
        Ok(())
    }
}
