//! Event attendee entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a participant row counts toward capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipState {
    /// Holds a slot; counted in `participant_count`.
    Active,
    /// Queued for a slot; never counted.
    Waitlisted,
}

/// An attendee's declared intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    #[sea_orm(string_value = "going")]
    Going,
    #[sea_orm(string_value = "maybe")]
    Maybe,
    #[sea_orm(string_value = "waitlist")]
    Waitlist,
    #[sea_orm(string_value = "declined")]
    Declined,
}

impl RsvpStatus {
    /// Capacity membership implied by this RSVP, if any.
    #[must_use]
    pub const fn membership_state(self) -> Option<MembershipState> {
        match self {
            Self::Going => Some(MembershipState::Active),
            Self::Waitlist => Some(MembershipState::Waitlisted),
            Self::Maybe | Self::Declined => None,
        }
    }

    /// Whether this RSVP holds a counted slot.
    #[must_use]
    pub const fn is_counted(self) -> bool {
        matches!(self, Self::Going)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_attendee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub rsvp: RsvpStatus,

    /// The organizer's row; never removed by `leave`.
    #[sea_orm(default_value = false)]
    pub is_organizer: bool,

    #[sea_orm(default_value = false)]
    pub checked_in: bool,

    #[sea_orm(nullable)]
    pub checked_in_at: Option<DateTimeWithTimeZone>,

    /// FIFO key for waitlist promotion.
    pub joined_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id",
        on_delete = "Cascade"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
