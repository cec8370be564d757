//! Create user, `user_profile` and `user_tag` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(User::Username)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::Token).string_len(64).unique_key())
                    .col(
                        ColumnDef::new(User::BuddiesCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserProfile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfile::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserProfile::DisplayName).string_len(128))
                    .col(ColumnDef::new(UserProfile::Nationality).string_len(8))
                    .col(ColumnDef::new(UserProfile::Bio).text())
                    .col(
                        ColumnDef::new(UserProfile::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profile_user")
                            .from(UserProfile::Table, UserProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserTag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserTag::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserTag::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UserTag::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(UserTag::Tag).string_len(64).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_tag_user")
                            .from(UserTag::Table, UserTag::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one row per (user, kind, tag)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_tag_user_kind_tag")
                    .table(UserTag::Table)
                    .col(UserTag::UserId)
                    .col(UserTag::Kind)
                    .col(UserTag::Tag)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (kind, tag) for interest-similarity sampling
        manager
            .create_index(
                Index::create()
                    .name("idx_user_tag_kind_tag")
                    .table(UserTag::Table)
                    .col(UserTag::Kind)
                    .col(UserTag::Tag)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Username,
    Token,
    BuddiesCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum UserProfile {
    Table,
    UserId,
    DisplayName,
    Nationality,
    Bio,
    UpdatedAt,
}

#[derive(Iden)]
enum UserTag {
    Table,
    Id,
    UserId,
    Kind,
    Tag,
}
