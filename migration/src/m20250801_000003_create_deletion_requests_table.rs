use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeletionRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeletionRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeletionRequests::SubjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeletionRequests::SubjectType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::VerifiedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::ScheduledDeletionAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::ProcessingStartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::ExecutedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::VerificationTokenHash)
                            .string_len(64)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::CancellationTokenHash)
                            .string_len(64)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DeletionRequests::Reason).text().null())
                    .col(ColumnDef::new(DeletionRequests::LastError).text().null())
                    .col(
                        ColumnDef::new(DeletionRequests::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeletionRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // バッチ選択用: status + scheduled_deletion_at
        manager
            .create_index(
                Index::create()
                    .name("idx_deletion_requests_status_scheduled")
                    .table(DeletionRequests::Table)
                    .col(DeletionRequests::Status)
                    .col(DeletionRequests::ScheduledDeletionAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deletion_requests_subject_id")
                    .table(DeletionRequests::Table)
                    .col(DeletionRequests::SubjectId)
                    .to_owned(),
            )
            .await?;

        // 同一サブジェクトの未終了リクエストは1件まで
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_deletion_requests_active_subject
                ON deletion_requests (subject_id)
                WHERE status IN ('pending_verification', 'verified', 'processing')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_deletion_requests_active_subject")
            .await?;

        manager
            .drop_table(Table::drop().table(DeletionRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeletionRequests {
    Table,
    Id,
    SubjectId,
    SubjectType,
    Status,
    RequestedAt,
    VerifiedAt,
    ScheduledDeletionAt,
    ProcessingStartedAt,
    ExecutedAt,
    VerificationTokenHash,
    CancellationTokenHash,
    Reason,
    LastError,
    Attempts,
    UpdatedAt,
}
