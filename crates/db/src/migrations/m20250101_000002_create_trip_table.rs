//! Create trip table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Trip::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Trip::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Trip::DestinationCode)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Trip::StartDate).date().not_null())
                    .col(ColumnDef::new(Trip::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Trip::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_user")
                            .from(Trip::Table, Trip::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (destination_code, end_date) for overlap discovery
        manager
            .create_index(
                Index::create()
                    .name("idx_trip_destination_end_date")
                    .table(Trip::Table)
                    .col(Trip::DestinationCode)
                    .col(Trip::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trip_user_id")
                    .table(Trip::Table)
                    .col(Trip::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Trip {
    Table,
    Id,
    UserId,
    DestinationCode,
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
