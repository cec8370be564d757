//! Invitation entity (pending invite to an invite-only activity or event).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::shared::SubjectKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invitation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub subject_kind: SubjectKind,

    #[sea_orm(indexed)]
    pub subject_id: String,

    pub inviter_id: String,

    #[sea_orm(indexed)]
    pub invitee_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InviteeId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Invitee,
}

impl ActiveModelBehavior for ActiveModel {}
