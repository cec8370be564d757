//! Create `buddy_connection` and `user_block` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BuddyConnection::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BuddyConnection::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BuddyConnection::LoUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BuddyConnection::HiUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BuddyConnection::RequestedBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BuddyConnection::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(BuddyConnection::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(BuddyConnection::ConnectedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(BuddyConnection::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_buddy_connection_lo_user")
                            .from(BuddyConnection::Table, BuddyConnection::LoUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_buddy_connection_hi_user")
                            .from(BuddyConnection::Table, BuddyConnection::HiUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one row per canonical pair
        manager
            .create_index(
                Index::create()
                    .name("idx_buddy_connection_pair")
                    .table(BuddyConnection::Table)
                    .col(BuddyConnection::LoUserId)
                    .col(BuddyConnection::HiUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: hi_user_id (pair lookups from the larger side)
        manager
            .create_index(
                Index::create()
                    .name("idx_buddy_connection_hi_user_id")
                    .table(BuddyConnection::Table)
                    .col(BuddyConnection::HiUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserBlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserBlock::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserBlock::BlockerId).string_len(32).not_null())
                    .col(ColumnDef::new(UserBlock::BlockedId).string_len(32).not_null())
                    .col(ColumnDef::new(UserBlock::Reason).text())
                    .col(
                        ColumnDef::new(UserBlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_block_blocker")
                            .from(UserBlock::Table, UserBlock::BlockerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_block_blocked")
                            .from(UserBlock::Table, UserBlock::BlockedId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (blocker_id, blocked_id) - prevent duplicate blocks
        manager
            .create_index(
                Index::create()
                    .name("idx_user_block_blocker_blocked")
                    .table(UserBlock::Table)
                    .col(UserBlock::BlockerId)
                    .col(UserBlock::BlockedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: blocked_id (for checking if blocked)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_block_blocked_id")
                    .table(UserBlock::Table)
                    .col(UserBlock::BlockedId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBlock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BuddyConnection::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BuddyConnection {
    Table,
    Id,
    LoUserId,
    HiUserId,
    RequestedBy,
    Status,
    CreatedAt,
    ConnectedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum UserBlock {
    Table,
    Id,
    BlockerId,
    BlockedId,
    Reason,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
