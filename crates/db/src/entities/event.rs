//! Event entity (scheduled gathering with an optional waitlist).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::shared::{CapacityStatus, Visibility};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User who organizes the event.
    #[sea_orm(indexed)]
    pub organizer_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(nullable)]
    pub category: Option<String>,

    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    #[sea_orm(nullable)]
    pub venue_name: Option<String>,

    pub starts_at: DateTimeWithTimeZone,

    /// After this instant nobody can RSVP or leave.
    pub ends_at: DateTimeWithTimeZone,

    /// Maximum number of `going` attendees (None = unlimited).
    #[sea_orm(nullable)]
    pub capacity: Option<i32>,

    /// Number of `going` attendees (denormalized, organizer included).
    #[sea_orm(default_value = 1)]
    pub participant_count: i32,

    pub status: CapacityStatus,

    pub visibility: Visibility,

    /// Whether a full event queues new `going` RSVPs instead of rejecting them.
    #[sea_orm(default_value = false)]
    pub waitlist_enabled: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OrganizerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Organizer,
    #[sea_orm(has_many = "super::event_attendee::Entity")]
    Attendees,
}

impl Related<super::event_attendee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
