//! Create event and `event_attendee` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Event::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Event::OrganizerId).string_len(32).not_null())
                    .col(ColumnDef::new(Event::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Event::Description).text())
                    .col(ColumnDef::new(Event::Category).string_len(64))
                    .col(ColumnDef::new(Event::Latitude).double())
                    .col(ColumnDef::new(Event::Longitude).double())
                    .col(ColumnDef::new(Event::VenueName).string_len(256))
                    .col(
                        ColumnDef::new(Event::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Event::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Event::Capacity).integer())
                    .col(
                        ColumnDef::new(Event::ParticipantCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Event::Status)
                            .string_len(20)
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Event::Visibility)
                            .string_len(20)
                            .not_null()
                            .default("public"),
                    )
                    .col(
                        ColumnDef::new(Event::WaitlistEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Event::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_organizer")
                            .from(Event::Table, Event::OrganizerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_lat_lon")
                    .table(Event::Table)
                    .col(Event::Latitude)
                    .col(Event::Longitude)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_organizer_id")
                    .table(Event::Table)
                    .col(Event::OrganizerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventAttendee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventAttendee::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventAttendee::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(EventAttendee::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(EventAttendee::Rsvp).string_len(20).not_null())
                    .col(
                        ColumnDef::new(EventAttendee::IsOrganizer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventAttendee::CheckedIn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(EventAttendee::CheckedInAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(EventAttendee::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(EventAttendee::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_attendee_event")
                            .from(EventAttendee::Table, EventAttendee::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_attendee_user")
                            .from(EventAttendee::Table, EventAttendee::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one RSVP row per user and event
        manager
            .create_index(
                Index::create()
                    .name("idx_event_attendee_event_user")
                    .table(EventAttendee::Table)
                    .col(EventAttendee::EventId)
                    .col(EventAttendee::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (event_id, rsvp, joined_at) for FIFO waitlist scans
        manager
            .create_index(
                Index::create()
                    .name("idx_event_attendee_event_rsvp_joined")
                    .table(EventAttendee::Table)
                    .col(EventAttendee::EventId)
                    .col(EventAttendee::Rsvp)
                    .col(EventAttendee::JoinedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventAttendee::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    OrganizerId,
    Title,
    Description,
    Category,
    Latitude,
    Longitude,
    VenueName,
    StartsAt,
    EndsAt,
    Capacity,
    ParticipantCount,
    Status,
    Visibility,
    WaitlistEnabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum EventAttendee {
    Table,
    Id,
    EventId,
    UserId,
    Rsvp,
    IsOrganizer,
    CheckedIn,
    CheckedInAt,
    JoinedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
