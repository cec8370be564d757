//! Create invitation and conversation tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invitation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invitation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invitation::SubjectKind).string_len(20).not_null())
                    .col(ColumnDef::new(Invitation::SubjectId).string_len(32).not_null())
                    .col(ColumnDef::new(Invitation::InviterId).string_len(32).not_null())
                    .col(ColumnDef::new(Invitation::InviteeId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Invitation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invitation_invitee")
                            .from(Invitation::Table, Invitation::InviteeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one invitation per invitee and subject
        manager
            .create_index(
                Index::create()
                    .name("idx_invitation_subject_invitee")
                    .table(Invitation::Table)
                    .col(Invitation::SubjectKind)
                    .col(Invitation::SubjectId)
                    .col(Invitation::InviteeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invitation_invitee_id")
                    .table(Invitation::Table)
                    .col(Invitation::InviteeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversation::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Conversation::SubjectId).string_len(80).not_null())
                    .col(ColumnDef::new(Conversation::CreatedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Conversation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: at most one room per subject
        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_kind_subject")
                    .table(Conversation::Table)
                    .col(Conversation::Kind)
                    .col(Conversation::SubjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invitation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Invitation {
    Table,
    Id,
    SubjectKind,
    SubjectId,
    InviterId,
    InviteeId,
    CreatedAt,
}

#[derive(Iden)]
enum Conversation {
    Table,
    Id,
    Kind,
    SubjectId,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
