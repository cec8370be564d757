//! Conversation repository.

use std::sync::Arc;

use crate::entities::{
    Conversation,
    conversation::{self, ConversationKind},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tripmate_common::{AppError, AppResult};

/// Conversation repository for database operations.
#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<DatabaseConnection>,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the conversation provisioned for a subject.
    pub async fn find_by_subject(
        &self,
        kind: ConversationKind,
        subject_id: &str,
    ) -> AppResult<Option<conversation::Model>> {
        Conversation::find()
            .filter(conversation::Column::Kind.eq(kind))
            .filter(conversation::Column::SubjectId.eq(subject_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new conversation.
    pub async fn create(
        &self,
        model: conversation::ActiveModel,
    ) -> AppResult<conversation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
