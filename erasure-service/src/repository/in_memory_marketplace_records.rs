// src/repository/in_memory_marketplace_records.rs

use crate::domain::deletion_plan::{RowSelector, ANONYMIZED_TEXT};
use crate::domain::subject::SubjectType;
use crate::error::AppResult;
use crate::repository::purge_backend::PurgeBackend;
use crate::repository::subject_directory::SubjectDirectory;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Marketplace records held as JSON objects per collection. Backs the
/// `memory` store backend and the test suite.
#[derive(Default)]
pub struct InMemoryMarketplaceRecords {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryMarketplaceRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_row(&self, collection: &str, row: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(row);
    }

    /// プロフィール行を追加してサブジェクトを登録する
    pub async fn add_subject(&self, subject_type: SubjectType, subject_id: Uuid, email: &str) {
        self.insert_row(
            subject_type.profile_table(),
            json!({
                "id": subject_id.to_string(),
                "display_name": format!("{} {}", subject_type, subject_id),
                "email": email,
            }),
        )
        .await;
    }

    pub async fn rows(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn field_is(row: &Value, column: &str, expected: &str) -> bool {
    row.get(column).and_then(Value::as_str) == Some(expected)
}

fn selected_ids(
    collections: &HashMap<String, Vec<Value>>,
    selector: &RowSelector,
    subject: &str,
) -> Option<HashSet<String>> {
    match *selector {
        RowSelector::Direct { .. } => None,
        RowSelector::Owned {
            parent,
            parent_column,
            ..
        } => Some(
            collections
                .get(parent)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| field_is(row, parent_column, subject))
                        .filter_map(|row| row.get("id").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        ),
    }
}

fn is_selected(row: &Value, selector: &RowSelector, subject: &str, owned: &Option<HashSet<String>>) -> bool {
    match owned {
        None => field_is(row, selector.column(), subject),
        Some(ids) => row
            .get(selector.column())
            .and_then(Value::as_str)
            .is_some_and(|id| ids.contains(id)),
    }
}

#[async_trait]
impl PurgeBackend for InMemoryMarketplaceRecords {
    async fn delete_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
    ) -> AppResult<u64> {
        let subject = subject_id.to_string();
        let mut collections = self.collections.write().await;
        let owned = selected_ids(&collections, selector, &subject);

        let Some(rows) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !is_selected(row, selector, &subject, &owned));
        Ok((before - rows.len()) as u64)
    }

    async fn anonymize_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
        scrub_columns: &[&str],
    ) -> AppResult<u64> {
        let subject = subject_id.to_string();
        let nil = Uuid::nil().to_string();
        let mut collections = self.collections.write().await;
        let owned = selected_ids(&collections, selector, &subject);

        let Some(rows) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in rows
            .iter_mut()
            .filter(|row| is_selected(row, selector, &subject, &owned))
        {
            if let Some(object) = row.as_object_mut() {
                if let RowSelector::Direct { column } = selector {
                    object.insert(column.to_string(), Value::String(nil.clone()));
                }
                for column in scrub_columns {
                    object.insert(column.to_string(), Value::String(ANONYMIZED_TEXT.to_string()));
                }
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl SubjectDirectory for InMemoryMarketplaceRecords {
    async fn subject_exists(&self, subject_id: Uuid, subject_type: SubjectType) -> AppResult<bool> {
        let subject = subject_id.to_string();
        Ok(self
            .collections
            .read()
            .await
            .get(subject_type.profile_table())
            .is_some_and(|rows| rows.iter().any(|row| field_is(row, "id", &subject))))
    }

    async fn contact_email(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
    ) -> AppResult<Option<String>> {
        let subject = subject_id.to_string();
        Ok(self
            .collections
            .read()
            .await
            .get(subject_type.profile_table())
            .and_then(|rows| rows.iter().find(|row| field_is(row, "id", &subject)))
            .and_then(|row| row.get("email").and_then(Value::as_str))
            .map(str::to_string))
    }
}
