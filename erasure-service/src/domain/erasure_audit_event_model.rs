// src/domain/erasure_audit_event_model.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subject::SubjectType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    #[sea_orm(string_value = "requested")]
    Requested,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "requeued")]
    Requeued,
    #[sea_orm(string_value = "stale_recovered")]
    StaleRecovered,
    #[sea_orm(string_value = "notification_failed")]
    NotificationFailed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "erasure_audit_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Option<Uuid>,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub kind: AuditEventKind,
    pub details: Option<Json>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 監査シンクに渡すイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErasureAuditEvent {
    pub request_id: Option<Uuid>,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub kind: AuditEventKind,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl ErasureAuditEvent {
    pub fn for_request(
        request: &super::deletion_request_model::Model,
        kind: AuditEventKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: Some(request.id),
            subject_id: request.subject_id,
            subject_type: request.subject_type,
            kind,
            details: serde_json::Value::Null,
            occurred_at,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

impl From<ErasureAuditEvent> for ActiveModel {
    fn from(event: ErasureAuditEvent) -> Self {
        use sea_orm::Set;

        let details = if event.details.is_null() {
            None
        } else {
            Some(event.details)
        };

        ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(event.request_id),
            subject_id: Set(event.subject_id),
            subject_type: Set(event.subject_type),
            kind: Set(event.kind),
            details: Set(details),
            occurred_at: Set(event.occurred_at),
        }
    }
}
