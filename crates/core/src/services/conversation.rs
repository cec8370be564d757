//! Conversation provisioning.
//!
//! Chat rooms are created by a collaborator behind
//! [`ConversationProvisioner`] so the community services do not depend on a
//! concrete messaging backend. Provisioning is best-effort: callers log
//! failures and carry on.

use async_trait::async_trait;
use sea_orm::Set;
use std::sync::Arc;
use tripmate_common::{AppResult, IdGenerator};
use tripmate_db::{
    entities::conversation::{self, ConversationKind},
    repositories::ConversationRepository,
};

/// Trait for provisioning chat rooms.
#[async_trait]
pub trait ConversationProvisioner: Send + Sync {
    /// Ensure a conversation exists for `subject_id`.
    async fn provision(
        &self,
        kind: ConversationKind,
        subject_id: &str,
        created_by: &str,
    ) -> AppResult<()>;
}

/// A no-op implementation for tests or when messaging is disabled.
#[derive(Clone, Default)]
pub struct NoOpConversations;

#[async_trait]
impl ConversationProvisioner for NoOpConversations {
    async fn provision(
        &self,
        _kind: ConversationKind,
        _subject_id: &str,
        _created_by: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Records one `conversation` row per subject.
#[derive(Clone)]
pub struct StoredConversations {
    conversation_repo: ConversationRepository,
    id_gen: IdGenerator,
}

impl StoredConversations {
    /// Create a new stored provisioner.
    #[must_use]
    pub const fn new(conversation_repo: ConversationRepository) -> Self {
        Self {
            conversation_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Look up the conversation of a subject.
    pub async fn find(
        &self,
        kind: ConversationKind,
        subject_id: &str,
    ) -> AppResult<Option<conversation::Model>> {
        self.conversation_repo.find_by_subject(kind, subject_id).await
    }
}

#[async_trait]
impl ConversationProvisioner for StoredConversations {
    async fn provision(
        &self,
        kind: ConversationKind,
        subject_id: &str,
        created_by: &str,
    ) -> AppResult<()> {
        if self
            .conversation_repo
            .find_by_subject(kind, subject_id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let model = conversation::ActiveModel {
            id: Set(self.id_gen.generate()),
            kind: Set(kind),
            subject_id: Set(subject_id.to_string()),
            created_by: Set(created_by.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.conversation_repo.create(model).await?;

        tracing::debug!(?kind, subject_id, "Provisioned conversation");
        Ok(())
    }
}

/// Wrapper for boxed `ConversationProvisioner` trait object.
pub type ConversationService = Arc<dyn ConversationProvisioner>;

/// Subject id of the direct conversation between two users.
#[must_use]
pub fn direct_subject(lo_user_id: &str, hi_user_id: &str) -> String {
    format!("{lo_user_id}:{hi_user_id}")
}

/// Provision a conversation, logging instead of failing.
pub(crate) async fn provision_best_effort(
    conversations: Option<&ConversationService>,
    kind: ConversationKind,
    subject_id: &str,
    created_by: &str,
) {
    if let Some(conversations) = conversations {
        if let Err(e) = conversations.provision(kind, subject_id, created_by).await {
            tracing::warn!(error = %e, ?kind, subject_id, "Failed to provision conversation");
        }
    }
}
