// src/repository/in_memory_deletion_request_store.rs

use crate::domain::deletion_request_model::{
    DeletionRequest, DeletionStatus, NewDeletionRequest, RequestSelector, StatusTransition,
};
use crate::error::{AppError, AppResult};
use crate::repository::deletion_request_repository::DeletionRequestStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Process-local request store. All check-and-set work happens under one
/// mutex, which gives the same at-most-one guarantees as the conditional
/// updates of the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryDeletionRequestStore {
    requests: Mutex<HashMap<Uuid, DeletionRequest>>,
}

impl InMemoryDeletionRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.lock().await.is_empty()
    }
}

fn has_open_request(
    requests: &HashMap<Uuid, DeletionRequest>,
    subject_id: Uuid,
    except: Option<Uuid>,
) -> bool {
    requests.values().any(|r| {
        r.subject_id == subject_id && !r.status.is_terminal() && Some(r.id) != except
    })
}

#[async_trait]
impl DeletionRequestStore for InMemoryDeletionRequestStore {
    async fn insert(&self, request: NewDeletionRequest) -> AppResult<DeletionRequest> {
        let mut requests = self.requests.lock().await;
        if has_open_request(&requests, request.subject_id, None) {
            return Err(AppError::DuplicateRequest(request.subject_id));
        }

        let model = request.into_model();
        requests.insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeletionRequest>> {
        Ok(self.requests.lock().await.get(&id).cloned())
    }

    async fn find_active_by_subject(
        &self,
        subject_id: Uuid,
    ) -> AppResult<Option<DeletionRequest>> {
        let requests = self.requests.lock().await;
        Ok(requests
            .values()
            .find(|r| r.subject_id == subject_id && !r.status.is_terminal())
            .cloned())
    }

    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Vec<DeletionRequest>> {
        let requests = self.requests.lock().await;
        let mut found: Vec<DeletionRequest> = requests
            .values()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(found)
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<DeletionRequest>> {
        let requests = self.requests.lock().await;
        let mut due: Vec<DeletionRequest> =
            requests.values().filter(|r| r.is_due(now)).cloned().collect();
        due.sort_by(|a, b| a.scheduled_deletion_at.cmp(&b.scheduled_deletion_at));
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn find_stale_processing(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> AppResult<Vec<DeletionRequest>> {
        let requests = self.requests.lock().await;
        let mut stale: Vec<DeletionRequest> = requests
            .values()
            .filter(|r| {
                r.status == DeletionStatus::Processing
                    && r.processing_started_at
                        .is_some_and(|started| started < claimed_before)
            })
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.processing_started_at.cmp(&b.processing_started_at));
        Ok(stale)
    }

    async fn apply(
        &self,
        selector: RequestSelector,
        transition: StatusTransition,
    ) -> AppResult<Option<DeletionRequest>> {
        let mut requests = self.requests.lock().await;

        let Some(id) = requests
            .values()
            .find(|r| selector.matches(r) && transition.permits(r))
            .map(|r| r.id)
        else {
            return Ok(None);
        };

        // 終了状態から戻す遷移では一意性を再確認する
        if let Some(current) = requests.get(&id) {
            if current.status.is_terminal()
                && !transition.to.is_terminal()
                && has_open_request(&requests, current.subject_id, Some(id))
            {
                return Err(AppError::Conflict(
                    "Subject already has an open deletion request".to_string(),
                ));
            }
        }

        Ok(requests.get_mut(&id).map(|request| {
            transition.apply_to(request);
            request.clone()
        }))
    }
}
