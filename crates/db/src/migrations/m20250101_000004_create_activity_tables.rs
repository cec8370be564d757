//! Create activity and `activity_participant` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activity::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Activity::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Activity::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Activity::Description).text())
                    .col(ColumnDef::new(Activity::Category).string_len(64))
                    .col(ColumnDef::new(Activity::Latitude).double())
                    .col(ColumnDef::new(Activity::Longitude).double())
                    .col(ColumnDef::new(Activity::LocationName).string_len(256))
                    .col(ColumnDef::new(Activity::Capacity).integer())
                    .col(
                        ColumnDef::new(Activity::ParticipantCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Activity::Status)
                            .string_len(20)
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Activity::Visibility)
                            .string_len(20)
                            .not_null()
                            .default("public"),
                    )
                    .col(
                        ColumnDef::new(Activity::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Activity::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Activity::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_creator")
                            .from(Activity::Table, Activity::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (latitude, longitude) for bounding-box discovery
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_lat_lon")
                    .table(Activity::Table)
                    .col(Activity::Latitude)
                    .col(Activity::Longitude)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_creator_id")
                    .table(Activity::Table)
                    .col(Activity::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActivityParticipant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityParticipant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActivityParticipant::ActivityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityParticipant::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityParticipant::IsOrganizer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActivityParticipant::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_participant_activity")
                            .from(ActivityParticipant::Table, ActivityParticipant::ActivityId)
                            .to(Activity::Table, Activity::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_participant_user")
                            .from(ActivityParticipant::Table, ActivityParticipant::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: a user participates at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_participant_activity_user")
                    .table(ActivityParticipant::Table)
                    .col(ActivityParticipant::ActivityId)
                    .col(ActivityParticipant::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityParticipant::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Activity::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Activity {
    Table,
    Id,
    CreatorId,
    Title,
    Description,
    Category,
    Latitude,
    Longitude,
    LocationName,
    Capacity,
    ParticipantCount,
    Status,
    Visibility,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ActivityParticipant {
    Table,
    Id,
    ActivityId,
    UserId,
    IsOrganizer,
    JoinedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
