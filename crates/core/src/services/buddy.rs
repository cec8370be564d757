//! Buddy connection service.
//!
//! `none -> pending -> connected`. A block in either direction pre-empts
//! every transition and removes whatever connection the pair had.

use crate::services::conversation::{ConversationService, direct_subject, provision_best_effort};
use chrono::Utc;
use sea_orm::Set;
use tripmate_common::{AppError, AppResult, IdGenerator};
use tripmate_db::{
    entities::{
        buddy_connection::{self, BuddyStatus},
        conversation::ConversationKind,
        user, user_block,
    },
    repositories::{BlockingRepository, BuddyRepository, UserRepository, canonical_pair},
};

/// Buddy service for business logic.
#[derive(Clone)]
pub struct BuddyService {
    buddy_repo: BuddyRepository,
    blocking_repo: BlockingRepository,
    user_repo: UserRepository,
    conversations: Option<ConversationService>,
    id_gen: IdGenerator,
}

impl BuddyService {
    /// Create a new buddy service.
    #[must_use]
    pub const fn new(
        buddy_repo: BuddyRepository,
        blocking_repo: BlockingRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            buddy_repo,
            blocking_repo,
            user_repo,
            conversations: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the conversation provisioner used on acceptance.
    pub fn set_conversations(&mut self, conversations: ConversationService) {
        self.conversations = Some(conversations);
    }

    /// Send a buddy request.
    pub async fn send_request(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> AppResult<buddy_connection::Model> {
        if requester_id == target_id {
            return Err(AppError::Validation(
                "Cannot send a buddy request to yourself".to_string(),
            ));
        }

        self.user_repo.get_by_id(target_id).await?;

        if self
            .blocking_repo
            .is_blocked_between(requester_id, target_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Cannot connect with this user".to_string(),
            ));
        }

        if let Some(existing) = self.buddy_repo.find_by_pair(requester_id, target_id).await? {
            return Err(match existing.status {
                BuddyStatus::Pending => {
                    AppError::Validation("A buddy request is already pending".to_string())
                }
                BuddyStatus::Connected => {
                    AppError::Validation("Already connected".to_string())
                }
                BuddyStatus::Blocked => {
                    AppError::Forbidden("Cannot connect with this user".to_string())
                }
            });
        }

        let (lo, hi) = canonical_pair(requester_id, target_id);
        let model = buddy_connection::ActiveModel {
            id: Set(self.id_gen.generate()),
            lo_user_id: Set(lo.to_string()),
            hi_user_id: Set(hi.to_string()),
            requested_by: Set(requester_id.to_string()),
            status: Set(BuddyStatus::Pending),
            created_at: Set(Utc::now().into()),
            connected_at: Set(None),
            updated_at: Set(None),
        };

        let connection = self.buddy_repo.create(model).await?;
        tracing::info!(
            connection_id = %connection.id,
            requester_id,
            target_id,
            "Buddy request sent"
        );
        Ok(connection)
    }

    /// Accept a pending request (recipient only).
    pub async fn accept_request(
        &self,
        actor_id: &str,
        connection_id: &str,
    ) -> AppResult<buddy_connection::Model> {
        let connection = self.pending_for_recipient(actor_id, connection_id).await?;

        if self
            .blocking_repo
            .is_blocked_between(&connection.lo_user_id, &connection.hi_user_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Cannot connect with this user".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active: buddy_connection::ActiveModel = connection.into();
        active.status = Set(BuddyStatus::Connected);
        active.connected_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));
        let connection = self.buddy_repo.update(active).await?;

        self.refresh_buddy_count(&connection.lo_user_id).await?;
        self.refresh_buddy_count(&connection.hi_user_id).await?;

        provision_best_effort(
            self.conversations.as_ref(),
            ConversationKind::Direct,
            &direct_subject(&connection.lo_user_id, &connection.hi_user_id),
            actor_id,
        )
        .await;

        tracing::info!(connection_id = %connection.id, "Buddy request accepted");
        Ok(connection)
    }

    /// Reject a pending request (recipient only). The row is deleted.
    pub async fn reject_request(&self, actor_id: &str, connection_id: &str) -> AppResult<()> {
        let connection = self.pending_for_recipient(actor_id, connection_id).await?;
        self.buddy_repo.delete(&connection.id).await?;
        tracing::info!(connection_id, "Buddy request rejected");
        Ok(())
    }

    /// Remove a connected buddy.
    pub async fn remove_buddy(&self, user_a: &str, user_b: &str) -> AppResult<()> {
        match self.buddy_repo.find_by_pair(user_a, user_b).await? {
            Some(c) if c.status == BuddyStatus::Connected => {
                self.sever(user_a, user_b).await?;
                tracing::info!(user_a, user_b, "Buddy removed");
                Ok(())
            }
            _ => Err(AppError::NotFound("Buddy connection".to_string())),
        }
    }

    /// Block a user. Idempotent; always removes any connection between the pair.
    pub async fn block_user(
        &self,
        blocker_id: &str,
        blocked_id: &str,
        reason: Option<String>,
    ) -> AppResult<user_block::Model> {
        if blocker_id == blocked_id {
            return Err(AppError::Validation("Cannot block yourself".to_string()));
        }

        self.user_repo.get_by_id(blocked_id).await?;

        let block = match self.blocking_repo.find_by_pair(blocker_id, blocked_id).await? {
            Some(existing) => existing,
            None => {
                let model = user_block::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    blocker_id: Set(blocker_id.to_string()),
                    blocked_id: Set(blocked_id.to_string()),
                    reason: Set(reason),
                    created_at: Set(Utc::now().into()),
                };
                self.blocking_repo.create(model).await?
            }
        };

        self.sever(blocker_id, blocked_id).await?;
        tracing::info!(blocker_id, blocked_id, "User blocked");
        Ok(block)
    }

    /// Remove a block.
    pub async fn unblock_user(&self, blocker_id: &str, blocked_id: &str) -> AppResult<()> {
        if !self
            .blocking_repo
            .delete_by_pair(blocker_id, blocked_id)
            .await?
        {
            return Err(AppError::NotFound("Not blocking this user".to_string()));
        }
        tracing::info!(blocker_id, blocked_id, "User unblocked");
        Ok(())
    }

    /// Check if either user is blocking the other.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }

    /// Blocks created by a user.
    pub async fn list_blocks(&self, blocker_id: &str) -> AppResult<Vec<user_block::Model>> {
        self.blocking_repo.find_by_blocker(blocker_id).await
    }

    /// Connected buddies of a user.
    pub async fn list_buddies(&self, user_id: &str) -> AppResult<Vec<user::Model>> {
        let ids = self.buddy_repo.find_connected_ids(user_id).await?;
        self.user_repo.find_by_ids(&ids).await
    }

    /// Pending requests a user has received.
    pub async fn list_incoming_requests(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<buddy_connection::Model>> {
        self.buddy_repo.find_incoming_pending(user_id).await
    }

    /// Pending requests a user has sent.
    pub async fn list_outgoing_requests(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<buddy_connection::Model>> {
        self.buddy_repo.find_outgoing_pending(user_id).await
    }

    /// The connection between two users, if any.
    pub async fn get_connection(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<buddy_connection::Model>> {
        self.buddy_repo.find_by_pair(user_a, user_b).await
    }

    async fn pending_for_recipient(
        &self,
        actor_id: &str,
        connection_id: &str,
    ) -> AppResult<buddy_connection::Model> {
        let connection = self
            .buddy_repo
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Buddy request: {connection_id}")))?;

        if !connection.involves(actor_id) || connection.recipient_id() != actor_id {
            return Err(AppError::Forbidden(
                "Only the recipient can answer a buddy request".to_string(),
            ));
        }
        if connection.status != BuddyStatus::Pending {
            return Err(AppError::InvalidState(
                "Buddy request is no longer pending".to_string(),
            ));
        }
        Ok(connection)
    }

    /// Delete any connection between the pair and recount both sides.
    async fn sever(&self, user_a: &str, user_b: &str) -> AppResult<()> {
        self.buddy_repo.delete_by_pair(user_a, user_b).await?;
        self.refresh_buddy_count(user_a).await?;
        self.refresh_buddy_count(user_b).await
    }

    async fn refresh_buddy_count(&self, user_id: &str) -> AppResult<()> {
        let count = self.buddy_repo.count_connected(user_id).await?;
        self.user_repo.set_buddies_count(user_id, count).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::conversation::StoredConversations;
    use crate::services::user::{RegisterInput, UserService};
    use std::sync::Arc;
    use tripmate_db::{repositories::ConversationRepository, test_utils::TestDatabase};

    struct Fixture {
        buddies: BuddyService,
        users: UserService,
        conversations: StoredConversations,
    }

    async fn setup() -> Fixture {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        let conversations = StoredConversations::new(ConversationRepository::new(Arc::clone(&db)));
        let mut buddies = BuddyService::new(
            BuddyRepository::new(Arc::clone(&db)),
            BlockingRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
        );
        buddies.set_conversations(Arc::new(conversations.clone()));
        Fixture {
            buddies,
            users: UserService::new(UserRepository::new(db)),
            conversations,
        }
    }

    async fn register(users: &UserService, name: &str) -> String {
        users
            .register(RegisterInput {
                username: name.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_request_to_self_is_validation_error() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;

        assert!(matches!(
            f.buddies.send_request(&a, &a).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_pair_is_canonical_in_both_directions() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&b, &a).await.unwrap();
        let (lo, hi) = canonical_pair(&a, &b);
        assert_eq!(conn.lo_user_id, lo);
        assert_eq!(conn.hi_user_id, hi);
        assert_eq!(conn.requested_by, b);

        // The reverse request hits the same stored row
        assert!(matches!(
            f.buddies.send_request(&a, &b).await,
            Err(AppError::Validation(_))
        ));
        let ab = f.buddies.get_connection(&a, &b).await.unwrap().unwrap();
        let ba = f.buddies.get_connection(&b, &a).await.unwrap().unwrap();
        assert_eq!(ab.id, conn.id);
        assert_eq!(ba.id, conn.id);
    }

    #[tokio::test]
    async fn test_accept_connects_and_counts() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&a, &b).await.unwrap();

        // The requester cannot accept their own request
        assert!(matches!(
            f.buddies.accept_request(&a, &conn.id).await,
            Err(AppError::Forbidden(_))
        ));

        let accepted = f.buddies.accept_request(&b, &conn.id).await.unwrap();
        assert_eq!(accepted.status, BuddyStatus::Connected);
        assert!(accepted.connected_at.is_some());

        assert_eq!(f.users.get(&a).await.unwrap().buddies_count, 1);
        assert_eq!(f.users.get(&b).await.unwrap().buddies_count, 1);

        let (lo, hi) = canonical_pair(&a, &b);
        assert!(
            f.conversations
                .find(ConversationKind::Direct, &direct_subject(lo, hi))
                .await
                .unwrap()
                .is_some()
        );

        // Accepting twice is a state error
        assert!(matches!(
            f.buddies.accept_request(&b, &conn.id).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_reject_deletes_row() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&a, &b).await.unwrap();
        f.buddies.reject_request(&b, &conn.id).await.unwrap();

        assert!(f.buddies.get_connection(&a, &b).await.unwrap().is_none());
        // A fresh request is possible again
        assert!(f.buddies.send_request(&a, &b).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_buddy_recounts() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&a, &b).await.unwrap();
        f.buddies.accept_request(&b, &conn.id).await.unwrap();
        f.buddies.remove_buddy(&b, &a).await.unwrap();

        assert_eq!(f.users.get(&a).await.unwrap().buddies_count, 0);
        assert_eq!(f.users.get(&b).await.unwrap().buddies_count, 0);
        assert!(matches!(
            f.buddies.remove_buddy(&a, &b).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_block_removes_connection_and_prevents_requests() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&a, &b).await.unwrap();
        f.buddies.accept_request(&b, &conn.id).await.unwrap();

        f.buddies.block_user(&b, &a, None).await.unwrap();
        // Blocking again is a no-op
        f.buddies.block_user(&b, &a, None).await.unwrap();

        assert!(f.buddies.get_connection(&a, &b).await.unwrap().is_none());
        assert_eq!(f.users.get(&a).await.unwrap().buddies_count, 0);

        // Either direction is blocked
        assert!(matches!(
            f.buddies.send_request(&a, &b).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.buddies.send_request(&b, &a).await,
            Err(AppError::Forbidden(_))
        ));

        f.buddies.unblock_user(&b, &a).await.unwrap();
        assert!(f.buddies.send_request(&a, &b).await.is_ok());
        assert!(matches!(
            f.buddies.unblock_user(&b, &a).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_block_pending_request() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;

        let conn = f.buddies.send_request(&a, &b).await.unwrap();
        f.buddies.block_user(&b, &a, Some("spam".to_string())).await.unwrap();

        assert!(matches!(
            f.buddies.accept_request(&b, &conn.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.buddies.list_incoming_requests(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_lists() {
        let f = setup().await;
        let a = register(&f.users, "alice").await;
        let b = register(&f.users, "bob").await;
        let c = register(&f.users, "carol").await;

        f.buddies.send_request(&a, &b).await.unwrap();
        let conn = f.buddies.send_request(&c, &b).await.unwrap();

        assert_eq!(f.buddies.list_incoming_requests(&b).await.unwrap().len(), 2);
        assert_eq!(f.buddies.list_outgoing_requests(&a).await.unwrap().len(), 1);
        assert!(f.buddies.list_incoming_requests(&a).await.unwrap().is_empty());

        f.buddies.accept_request(&b, &conn.id).await.unwrap();
        let buddies = f.buddies.list_buddies(&b).await.unwrap();
        assert_eq!(buddies.len(), 1);
        assert_eq!(buddies[0].id, c);
    }
}
