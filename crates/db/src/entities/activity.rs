//! Activity entity (ad-hoc meetup with an optional hard capacity).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::shared::{CapacityStatus, Visibility};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User who created (and organizes) the activity.
    #[sea_orm(indexed)]
    pub creator_id: String,

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
    pub location_name: Option<String>,

    /// Maximum number of active participants (None = unlimited).
    #[sea_orm(nullable)]
    pub capacity: Option<i32>,

    /// Number of active participants (denormalized, organizer included).
    #[sea_orm(default_value = 1)]
    pub participant_count: i32,

    pub status: CapacityStatus,

    pub visibility: Visibility,

    /// After this instant nobody can join or leave.
    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_many = "super::activity_participant::Entity")]
    Participants,
}

impl Related<super::activity_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
