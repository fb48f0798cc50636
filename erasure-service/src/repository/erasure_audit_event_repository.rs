// src/repository/erasure_audit_event_repository.rs

use crate::db::DbPool;
use crate::domain::erasure_audit_event_model::{
    ActiveModel, Column, Entity, ErasureAuditEvent, Model,
};
use crate::error::AppResult;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

#[derive(Clone)]
pub struct ErasureAuditEventRepository {
    db: DbPool,
}

impl ErasureAuditEventRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, event: ErasureAuditEvent) -> AppResult<Model> {
        let active: ActiveModel = event.into();
        Ok(active.insert(&self.db).await?)
    }

    pub async fn find_by_request(&self, request_id: Uuid) -> AppResult<Vec<Model>> {
        let events = Entity::find()
            .filter(Column::RequestId.eq(request_id))
            .order_by_asc(Column::OccurredAt)
            .all(&self.db)
            .await?;

        Ok(events)
    }
}
