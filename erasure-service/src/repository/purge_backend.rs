// src/repository/purge_backend.rs

use crate::domain::deletion_plan::{PlanEntry, PurgePolicy, RowSelector};
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Row-level operations the cascade executor needs from a record store.
#[async_trait]
pub trait PurgeBackend: Send + Sync {
    /// Deletes every row selected for the subject and returns the row count.
    async fn delete_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
    ) -> AppResult<u64>;

    /// Scrubs identifying columns of every selected row, keeping the row.
    async fn anonymize_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
        scrub_columns: &[&str],
    ) -> AppResult<u64>;

    async fn purge(&self, entry: &PlanEntry, subject_id: Uuid) -> AppResult<u64> {
        match entry.policy {
            PurgePolicy::Delete => {
                self.delete_rows(entry.collection, &entry.selector, subject_id)
                    .await
            }
            PurgePolicy::Anonymize { scrub_columns } => {
                self.anonymize_rows(entry.collection, &entry.selector, subject_id, scrub_columns)
                    .await
            }
        }
    }
}
