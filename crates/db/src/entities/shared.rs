//! Enums shared by the capacity-constrained entities (activities and events).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership status of a capacity-constrained entity.
///
/// `Full` iff a capacity is set and the participant count reached it;
/// `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl Default for CapacityStatus {
    fn default() -> Self {
        Self::Open
    }
}

/// Who may see and join an activity or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed and joinable by anyone.
    #[sea_orm(string_value = "public")]
    Public,
    /// Listed for the creator's buddies.
    #[sea_orm(string_value = "buddies")]
    Buddies,
    /// Only invited users are notified.
    #[sea_orm(string_value = "invite_only")]
    InviteOnly,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

/// Kind of entity an invitation or conversation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    #[sea_orm(string_value = "activity")]
    Activity,
    #[sea_orm(string_value = "event")]
    Event,
}
