//! Invitation repository.

use std::sync::Arc;

use crate::entities::{Invitation, invitation, shared::SubjectKind};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use tripmate_common::{AppError, AppResult};

/// Invitation repository for database operations.
#[derive(Clone)]
pub struct InvitationRepository {
    db: Arc<DatabaseConnection>,
}

impl InvitationRepository {
    /// Create a new invitation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Invitations for one activity or event.
    pub async fn find_by_subject(
        &self,
        kind: SubjectKind,
        subject_id: &str,
    ) -> AppResult<Vec<invitation::Model>> {
        Invitation::find()
            .filter(invitation::Column::SubjectKind.eq(kind))
            .filter(invitation::Column::SubjectId.eq(subject_id))
            .order_by_asc(invitation::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a user was invited to a subject.
    pub async fn is_invited(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        invitee_id: &str,
    ) -> AppResult<bool> {
        let count = Invitation::find()
            .filter(invitation::Column::SubjectKind.eq(kind))
            .filter(invitation::Column::SubjectId.eq(subject_id))
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// IDs of subjects of `kind` a user was invited to.
    pub async fn find_subject_ids_for_invitee(
        &self,
        kind: SubjectKind,
        invitee_id: &str,
    ) -> AppResult<Vec<String>> {
        let rows = Invitation::find()
            .filter(invitation::Column::SubjectKind.eq(kind))
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|i| i.subject_id).collect())
    }
}

/// Insert invitations on `conn`, which may be an open transaction.
pub(crate) async fn insert_invitations<C: ConnectionTrait>(
    conn: &C,
    models: Vec<invitation::ActiveModel>,
) -> AppResult<()> {
    if models.is_empty() {
        return Ok(());
    }

    Invitation::insert_many(models)
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}
