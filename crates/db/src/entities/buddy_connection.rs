//! Buddy connection entity (undirected relationship stored once per pair).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a buddy connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BuddyStatus {
    /// Requested, waiting for the other party.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Both parties agreed.
    #[sea_orm(string_value = "connected")]
    Connected,
    /// Frozen by an external moderation process.
    #[sea_orm(string_value = "blocked")]
    Blocked,
}

/// Buddy connection.
///
/// The pair is stored in canonical order: `lo_user_id < hi_user_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buddy_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lexicographically smaller user id of the pair
    #[sea_orm(indexed)]
    pub lo_user_id: String,

    /// Lexicographically larger user id of the pair
    #[sea_orm(indexed)]
    pub hi_user_id: String,

    /// Which side of the pair sent the request
    pub requested_by: String,

    pub status: BuddyStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub connected_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether `user_id` is one side of this pair.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.lo_user_id == user_id || self.hi_user_id == user_id
    }

    /// The side of the pair that did not send the request.
    #[must_use]
    pub fn recipient_id(&self) -> &str {
        if self.requested_by == self.lo_user_id {
            &self.hi_user_id
        } else {
            &self.lo_user_id
        }
    }

    /// The other side of the pair, seen from `user_id`.
    #[must_use]
    pub fn other_party(&self, user_id: &str) -> Option<&str> {
        if self.lo_user_id == user_id {
            Some(&self.hi_user_id)
        } else if self.hi_user_id == user_id {
            Some(&self.lo_user_id)
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LoUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    LoUser,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HiUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    HiUser,
}

impl ActiveModelBehavior for ActiveModel {}
