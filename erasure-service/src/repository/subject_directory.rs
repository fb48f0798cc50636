// src/repository/subject_directory.rs

use crate::domain::subject::SubjectType;
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Lookup into the subject profile stores owned by the wider system.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn subject_exists(&self, subject_id: Uuid, subject_type: SubjectType) -> AppResult<bool>;

    /// 通知先のメールアドレス（未登録なら None）
    async fn contact_email(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
    ) -> AppResult<Option<String>>;
}
