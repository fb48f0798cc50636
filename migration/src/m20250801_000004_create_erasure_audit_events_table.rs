use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ErasureAuditEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErasureAuditEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ErasureAuditEvents::RequestId).uuid().null())
                    .col(
                        ColumnDef::new(ErasureAuditEvents::SubjectId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ErasureAuditEvents::SubjectType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ErasureAuditEvents::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ErasureAuditEvents::Details).json_binary().null())
                    .col(
                        ColumnDef::new(ErasureAuditEvents::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_erasure_audit_events_request_id")
                    .table(ErasureAuditEvents::Table)
                    .col(ErasureAuditEvents::RequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ErasureAuditEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ErasureAuditEvents {
    Table,
    Id,
    RequestId,
    SubjectId,
    SubjectType,
    Kind,
    Details,
    OccurredAt,
}
