//! Conversation entity (chat room provisioned for a subject).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a conversation was provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Between two connected buddies; subject is `"{lo_id}:{hi_id}"`.
    #[sea_orm(string_value = "direct")]
    Direct,
    /// Group room for an activity.
    #[sea_orm(string_value = "activity")]
    Activity,
    /// Group room for an event.
    #[sea_orm(string_value = "event")]
    Event,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub kind: ConversationKind,

    pub subject_id: String,

    /// User whose action provisioned the room.
    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
