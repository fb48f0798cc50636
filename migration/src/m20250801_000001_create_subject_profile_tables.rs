use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 4 subject types share the same profile layout
        for table in [
            Profile::RenterProfiles,
            Profile::LandlordProfiles,
            Profile::AgencyProfiles,
            Profile::AdminProfiles,
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(ColumnDef::new(Profile::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Profile::DisplayName)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Profile::Email).string_len(255).null())
                        .col(
                            ColumnDef::new(Profile::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Profile::AdminProfiles,
            Profile::AgencyProfiles,
            Profile::LandlordProfiles,
            Profile::RenterProfiles,
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Profile {
    RenterProfiles,
    LandlordProfiles,
    AgencyProfiles,
    AdminProfiles,
    Id,
    DisplayName,
    Email,
    CreatedAt,
}
