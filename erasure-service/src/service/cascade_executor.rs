// src/service/cascade_executor.rs

use crate::domain::deletion_plan::{plan_for, tiers, PlanEntry};
use crate::domain::subject::SubjectType;
use crate::log_with_context;
use crate::repository::purge_backend::PurgeBackend;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Result of purging one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub collection: &'static str,
    pub tier: u8,
    pub anonymized: bool,
    pub rows_affected: u64,
    pub error: Option<String>,
}

impl CollectionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionError {
    pub collection: &'static str,
    pub message: String,
}

/// Per-subject summary; `collections` follows plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub collections: Vec<CollectionOutcome>,
    pub rows_deleted: u64,
    pub rows_anonymized: u64,
    pub errors: Vec<CollectionError>,
}

impl CascadeReport {
    /// 全コレクションが失敗したか（空のプランは失敗扱いしない）
    pub fn all_failed(&self) -> bool {
        !self.collections.is_empty() && self.collections.iter().all(|c| !c.succeeded())
    }

    /// Collections that were purged without error.
    pub fn tables_affected(&self) -> Vec<&'static str> {
        self.collections
            .iter()
            .filter(|c| c.succeeded())
            .map(|c| c.collection)
            .collect()
    }

    fn push(&mut self, outcome: CollectionOutcome) {
        match &outcome.error {
            Some(message) => self.errors.push(CollectionError {
                collection: outcome.collection,
                message: message.clone(),
            }),
            None if outcome.anonymized => self.rows_anonymized += outcome.rows_affected,
            None => self.rows_deleted += outcome.rows_affected,
        }
        self.collections.push(outcome);
    }
}

/// Walks a subject's deletion plan tier by tier. Siblings within a tier run
/// concurrently; a failing collection never stops the rest of the plan.
pub struct CascadeExecutor {
    backend: Arc<dyn PurgeBackend>,
    call_timeout: Duration,
}

impl CascadeExecutor {
    pub fn new(backend: Arc<dyn PurgeBackend>, call_timeout: Duration) -> Self {
        Self {
            backend,
            call_timeout,
        }
    }

    pub async fn execute_for(&self, subject_id: Uuid, subject_type: SubjectType) -> CascadeReport {
        self.execute_plan(plan_for(subject_type), subject_id).await
    }

    pub async fn execute_plan(&self, plan: &'static [PlanEntry], subject_id: Uuid) -> CascadeReport {
        let mut outcomes: Vec<Option<CollectionOutcome>> = vec![None; plan.len()];
        let mut offset = 0;

        for tier in tiers(plan) {
            let mut tasks = JoinSet::new();
            for (i, entry) in tier.iter().enumerate() {
                let backend = Arc::clone(&self.backend);
                let call_timeout = self.call_timeout;
                let index = offset + i;
                tasks.spawn(async move {
                    let result = tokio::time::timeout(call_timeout, backend.purge(entry, subject_id))
                        .await
                        .map_err(|_| format!("timed out after {}ms", call_timeout.as_millis()))
                        .and_then(|r| r.map_err(|e| e.to_string()));
                    (index, entry, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (index, entry, result) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        // panic したタスクは下で未完了として記録される
                        log_with_context!(
                            tracing::Level::ERROR,
                            "Purge task aborted",
                            "subject_id" => subject_id,
                            "error" => e.to_string()
                        );
                        continue;
                    }
                };
                outcomes[index] = Some(outcome_from(entry, subject_id, result));
            }
            offset += tier.len();
        }

        let mut report = CascadeReport::default();
        for (entry, outcome) in plan.iter().zip(outcomes) {
            report.push(outcome.unwrap_or_else(|| CollectionOutcome {
                collection: entry.collection,
                tier: entry.tier,
                anonymized: entry.policy.is_anonymize(),
                rows_affected: 0,
                error: Some("purge task did not complete".to_string()),
            }));
        }
        report
    }
}

fn outcome_from(
    entry: &PlanEntry,
    subject_id: Uuid,
    result: Result<u64, String>,
) -> CollectionOutcome {
    let anonymized = entry.policy.is_anonymize();
    match result {
        Ok(rows_affected) => {
            log_with_context!(
                tracing::Level::DEBUG,
                "Collection purged",
                "subject_id" => subject_id,
                "collection" => entry.collection,
                "anonymized" => anonymized,
                "rows_affected" => rows_affected
            );
            CollectionOutcome {
                collection: entry.collection,
                tier: entry.tier,
                anonymized,
                rows_affected,
                error: None,
            }
        }
        Err(message) => {
            log_with_context!(
                tracing::Level::WARN,
                "Collection purge failed",
                "subject_id" => subject_id,
                "collection" => entry.collection,
                "error" => &message
            );
            CollectionOutcome {
                collection: entry.collection,
                tier: entry.tier,
                anonymized,
                rows_affected: 0,
                error: Some(message),
            }
        }
    }
}
