// src/repository/marketplace_record_repository.rs

use crate::db::DbPool;
use crate::domain::deletion_plan::{RowSelector, ANONYMIZED_TEXT};
use crate::domain::subject::SubjectType;
use crate::error::AppResult;
use crate::repository::purge_backend::PurgeBackend;
use crate::repository::subject_directory::SubjectDirectory;
use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query, SimpleExpr};
use sea_orm::ConnectionTrait;
use uuid::Uuid;

/// Marketplace tables in PostgreSQL, addressed by name from the deletion plans.
#[derive(Clone)]
pub struct MarketplaceRecordRepository {
    db: DbPool,
}

impl MarketplaceRecordRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

fn subject_condition(selector: &RowSelector, subject_id: Uuid) -> SimpleExpr {
    match *selector {
        RowSelector::Direct { column } => Expr::col(Alias::new(column)).eq(subject_id),
        RowSelector::Owned {
            column,
            parent,
            parent_column,
        } => Expr::col(Alias::new(column)).in_subquery(
            Query::select()
                .column(Alias::new("id"))
                .from(Alias::new(parent))
                .and_where(Expr::col(Alias::new(parent_column)).eq(subject_id))
                .to_owned(),
        ),
    }
}

#[async_trait]
impl PurgeBackend for MarketplaceRecordRepository {
    async fn delete_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
    ) -> AppResult<u64> {
        let stmt = Query::delete()
            .from_table(Alias::new(collection))
            .and_where(subject_condition(selector, subject_id))
            .to_owned();

        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&stmt)).await?;
        Ok(result.rows_affected())
    }

    async fn anonymize_rows(
        &self,
        collection: &str,
        selector: &RowSelector,
        subject_id: Uuid,
        scrub_columns: &[&str],
    ) -> AppResult<u64> {
        let mut stmt = Query::update();
        stmt.table(Alias::new(collection));

        // 参照列は nil UUID に置き換える（再実行時は対象行が無くなる）
        let mut has_values = false;
        if let RowSelector::Direct { column } = selector {
            stmt.value(Alias::new(*column), Uuid::nil());
            has_values = true;
        }
        for column in scrub_columns {
            stmt.value(Alias::new(*column), ANONYMIZED_TEXT);
            has_values = true;
        }
        if !has_values {
            return Ok(0);
        }
        stmt.and_where(subject_condition(selector, subject_id));

        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&stmt)).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SubjectDirectory for MarketplaceRecordRepository {
    async fn subject_exists(&self, subject_id: Uuid, subject_type: SubjectType) -> AppResult<bool> {
        let stmt = Query::select()
            .expr(Expr::val(1))
            .from(Alias::new(subject_type.profile_table()))
            .and_where(Expr::col(Alias::new("id")).eq(subject_id))
            .limit(1)
            .to_owned();

        let backend = self.db.get_database_backend();
        let row = self.db.query_one(backend.build(&stmt)).await?;
        Ok(row.is_some())
    }

    async fn contact_email(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
    ) -> AppResult<Option<String>> {
        let stmt = Query::select()
            .column(Alias::new("email"))
            .from(Alias::new(subject_type.profile_table()))
            .and_where(Expr::col(Alias::new("id")).eq(subject_id))
            .to_owned();

        let backend = self.db.get_database_backend();
        match self.db.query_one(backend.build(&stmt)).await? {
            Some(row) => Ok(row.try_get::<Option<String>>("", "email")?),
            None => Ok(None),
        }
    }
}
