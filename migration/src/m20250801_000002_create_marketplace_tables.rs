use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 物件
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(uuid_pk(Properties::Id))
                    .col(ColumnDef::new(Properties::LandlordId).uuid().not_null())
                    .col(ColumnDef::new(Properties::AgencyId).uuid().null())
                    .col(ColumnDef::new(Properties::AgencyContact).string_len(255).null())
                    .col(ColumnDef::new(Properties::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Properties::MonthlyRent).integer().not_null())
                    .col(created_at(Properties::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // マッチング（物件への参照を持つ）
        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(uuid_pk(Matches::Id))
                    .col(ColumnDef::new(Matches::PropertyId).uuid().not_null())
                    .col(ColumnDef::new(Matches::RenterId).uuid().not_null())
                    .col(ColumnDef::new(Matches::LandlordId).uuid().not_null())
                    .col(ColumnDef::new(Matches::Score).integer().not_null().default(0))
                    .col(created_at(Matches::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_matches_property_id")
                            .from(Matches::Table, Matches::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Conversations::Table)
                    .if_not_exists()
                    .col(uuid_pk(Conversations::Id))
                    .col(ColumnDef::new(Conversations::MatchId).uuid().not_null())
                    .col(ColumnDef::new(Conversations::RenterId).uuid().not_null())
                    .col(ColumnDef::new(Conversations::LandlordId).uuid().not_null())
                    .col(created_at(Conversations::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversations_match_id")
                            .from(Conversations::Table, Conversations::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(uuid_pk(Messages::Id))
                    .col(ColumnDef::new(Messages::ConversationId).uuid().not_null())
                    .col(ColumnDef::new(Messages::SenderId).uuid().not_null())
                    .col(ColumnDef::new(Messages::Body).text().not_null())
                    .col(created_at(Messages::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_conversation_id")
                            .from(Messages::Table, Messages::ConversationId)
                            .to(Conversations::Table, Conversations::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ViewingRequests::Table)
                    .if_not_exists()
                    .col(uuid_pk(ViewingRequests::Id))
                    .col(ColumnDef::new(ViewingRequests::PropertyId).uuid().not_null())
                    .col(ColumnDef::new(ViewingRequests::RenterId).uuid().not_null())
                    .col(ColumnDef::new(ViewingRequests::LandlordId).uuid().not_null())
                    .col(
                        ColumnDef::new(ViewingRequests::RequestedFor)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(created_at(ViewingRequests::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_viewing_requests_property_id")
                            .from(ViewingRequests::Table, ViewingRequests::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RentalApplications::Table)
                    .if_not_exists()
                    .col(uuid_pk(RentalApplications::Id))
                    .col(
                        ColumnDef::new(RentalApplications::PropertyId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RentalApplications::RenterId).uuid().not_null())
                    .col(ColumnDef::new(RentalApplications::IncomeStatement).text().null())
                    .col(created_at(RentalApplications::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rental_applications_property_id")
                            .from(RentalApplications::Table, RentalApplications::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SavedSearches::Table)
                    .if_not_exists()
                    .col(uuid_pk(SavedSearches::Id))
                    .col(ColumnDef::new(SavedSearches::RenterId).uuid().not_null())
                    .col(ColumnDef::new(SavedSearches::Criteria).json_binary().not_null())
                    .col(created_at(SavedSearches::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // 評価は集計に使われるため匿名化のみ（外部キー制約なし）
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(uuid_pk(Ratings::Id))
                    .col(ColumnDef::new(Ratings::RaterId).uuid().not_null())
                    .col(ColumnDef::new(Ratings::RateeId).uuid().not_null())
                    .col(ColumnDef::new(Ratings::Stars).small_integer().not_null())
                    .col(ColumnDef::new(Ratings::Comment).text().null())
                    .col(created_at(Ratings::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(uuid_pk(Invoices::Id))
                    .col(ColumnDef::new(Invoices::LandlordId).uuid().null())
                    .col(ColumnDef::new(Invoices::AgencyId).uuid().null())
                    .col(ColumnDef::new(Invoices::BillingName).string_len(255).null())
                    .col(ColumnDef::new(Invoices::BillingAddress).text().null())
                    .col(ColumnDef::new(Invoices::AmountCents).big_integer().not_null())
                    .col(created_at(Invoices::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AgencyAgents::Table)
                    .if_not_exists()
                    .col(uuid_pk(AgencyAgents::Id))
                    .col(ColumnDef::new(AgencyAgents::AgencyId).uuid().not_null())
                    .col(ColumnDef::new(AgencyAgents::FullName).string_len(255).not_null())
                    .col(ColumnDef::new(AgencyAgents::Phone).string_len(64).null())
                    .col(created_at(AgencyAgents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminNotes::Table)
                    .if_not_exists()
                    .col(uuid_pk(AdminNotes::Id))
                    .col(ColumnDef::new(AdminNotes::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(AdminNotes::Body).text().not_null())
                    .col(created_at(AdminNotes::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // 削除計画で使う参照列のインデックス
        for (name, table, column) in [
            ("idx_messages_sender_id", Messages::Table.into_iden(), Messages::SenderId.into_iden()),
            ("idx_conversations_renter_id", Conversations::Table.into_iden(), Conversations::RenterId.into_iden()),
            ("idx_conversations_landlord_id", Conversations::Table.into_iden(), Conversations::LandlordId.into_iden()),
            ("idx_matches_renter_id", Matches::Table.into_iden(), Matches::RenterId.into_iden()),
            ("idx_matches_landlord_id", Matches::Table.into_iden(), Matches::LandlordId.into_iden()),
            ("idx_properties_landlord_id", Properties::Table.into_iden(), Properties::LandlordId.into_iden()),
            ("idx_ratings_rater_id", Ratings::Table.into_iden(), Ratings::RaterId.into_iden()),
            ("idx_ratings_ratee_id", Ratings::Table.into_iden(), Ratings::RateeId.into_iden()),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 依存関係の逆順で削除
        let tables = [
            AdminNotes::Table.into_iden(),
            AgencyAgents::Table.into_iden(),
            Invoices::Table.into_iden(),
            Ratings::Table.into_iden(),
            SavedSearches::Table.into_iden(),
            RentalApplications::Table.into_iden(),
            ViewingRequests::Table.into_iden(),
            Messages::Table.into_iden(),
            Conversations::Table.into_iden(),
            Matches::Table.into_iden(),
            Properties::Table.into_iden(),
        ];
        for table in tables {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

fn uuid_pk<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .uuid()
        .not_null()
        .primary_key()
        .extra("DEFAULT gen_random_uuid()".to_owned())
        .to_owned()
}

fn created_at<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
    LandlordId,
    AgencyId,
    AgencyContact,
    Title,
    MonthlyRent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Matches {
    Table,
    Id,
    PropertyId,
    RenterId,
    LandlordId,
    Score,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Conversations {
    Table,
    Id,
    MatchId,
    RenterId,
    LandlordId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    ConversationId,
    SenderId,
    Body,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ViewingRequests {
    Table,
    Id,
    PropertyId,
    RenterId,
    LandlordId,
    RequestedFor,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RentalApplications {
    Table,
    Id,
    PropertyId,
    RenterId,
    IncomeStatement,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SavedSearches {
    Table,
    Id,
    RenterId,
    Criteria,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    RaterId,
    RateeId,
    Stars,
    Comment,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    LandlordId,
    AgencyId,
    BillingName,
    BillingAddress,
    AmountCents,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AgencyAgents {
    Table,
    Id,
    AgencyId,
    FullName,
    Phone,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdminNotes {
    Table,
    Id,
    AuthorId,
    Body,
    CreatedAt,
}
