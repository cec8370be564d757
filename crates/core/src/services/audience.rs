//! Who may see and join an activity or event.
//!
//! - `public`: everyone
//! - `buddies`: the organizer's connected buddies
//! - `invite_only`: users holding an invitation
//!
//! The organizer always passes.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::Set;
use tripmate_common::{AppError, AppResult, IdGenerator};
use tripmate_db::{
    entities::{
        invitation,
        shared::{SubjectKind, Visibility},
    },
    repositories::{BuddyRepository, InvitationRepository, UserRepository},
};

/// Snapshot of what one viewer is allowed to see, for filtering lists
/// without a query per item.
#[derive(Debug, Clone, Default)]
pub struct ViewerScope {
    viewer_id: String,
    buddy_ids: HashSet<String>,
    invited_subject_ids: HashSet<String>,
}

impl ViewerScope {
    /// Whether the viewer may see a subject with these properties.
    #[must_use]
    pub fn can_see(&self, visibility: Visibility, organizer_id: &str, subject_id: &str) -> bool {
        if organizer_id == self.viewer_id {
            return true;
        }
        match visibility {
            Visibility::Public => true,
            Visibility::Buddies => self.buddy_ids.contains(organizer_id),
            Visibility::InviteOnly => self.invited_subject_ids.contains(subject_id),
        }
    }
}

/// Visibility checks and invitation bookkeeping.
#[derive(Clone)]
pub struct Audience {
    buddy_repo: BuddyRepository,
    invitation_repo: InvitationRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl Audience {
    /// Create a new audience helper.
    #[must_use]
    pub const fn new(
        buddy_repo: BuddyRepository,
        invitation_repo: InvitationRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            buddy_repo,
            invitation_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Fail with `Forbidden` unless `user_id` may join the subject.
    pub async fn ensure_can_join(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        visibility: Visibility,
        organizer_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        if user_id == organizer_id {
            return Ok(());
        }

        let allowed = match visibility {
            Visibility::Public => true,
            Visibility::Buddies => self
                .buddy_repo
                .find_connected_ids(organizer_id)
                .await?
                .iter()
                .any(|id| id == user_id),
            Visibility::InviteOnly => {
                self.invitation_repo
                    .is_invited(kind, subject_id, user_id)
                    .await?
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Not allowed to join {subject_id}"
            )))
        }
    }

    /// Load the visibility scope of a viewer.
    pub async fn viewer_scope(&self, kind: SubjectKind, viewer_id: &str) -> AppResult<ViewerScope> {
        let buddy_ids = self.buddy_repo.find_connected_ids(viewer_id).await?;
        let invited = self
            .invitation_repo
            .find_subject_ids_for_invitee(kind, viewer_id)
            .await?;

        Ok(ViewerScope {
            viewer_id: viewer_id.to_string(),
            buddy_ids: buddy_ids.into_iter().collect(),
            invited_subject_ids: invited.into_iter().collect(),
        })
    }

    /// Build invitation rows for a subject that is about to be created.
    ///
    /// Self-invites, duplicates and unknown users are skipped. Nothing is
    /// written here; the rows are inserted in the subject's own transaction.
    pub async fn prepare_invitations(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        inviter_id: &str,
        invitee_ids: &[String],
    ) -> AppResult<Vec<invitation::ActiveModel>> {
        let mut requested: Vec<String> = invitee_ids
            .iter()
            .filter(|id| id.as_str() != inviter_id)
            .cloned()
            .collect();
        requested.sort();
        requested.dedup();

        let existing: HashSet<String> = self
            .user_repo
            .find_existing_ids(&requested)
            .await?
            .into_iter()
            .collect();

        let now = Utc::now();
        let models: Vec<invitation::ActiveModel> = requested
            .into_iter()
            .filter(|id| existing.contains(id))
            .map(|invitee_id| invitation::ActiveModel {
                id: Set(self.id_gen.generate()),
                subject_kind: Set(kind),
                subject_id: Set(subject_id.to_string()),
                inviter_id: Set(inviter_id.to_string()),
                invitee_id: Set(invitee_id),
                created_at: Set(now.into()),
            })
            .collect();

        tracing::debug!(?kind, subject_id, count = models.len(), "Prepared invitations");
        Ok(models)
    }

    /// Invitations for a subject.
    pub async fn invitations(
        &self,
        kind: SubjectKind,
        subject_id: &str,
    ) -> AppResult<Vec<invitation::Model>> {
        self.invitation_repo.find_by_subject(kind, subject_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::hashset;

    fn scope() -> ViewerScope {
        ViewerScope {
            viewer_id: "me".to_string(),
            buddy_ids: hashset! {"friend".to_string()},
            invited_subject_ids: hashset! {"a1".to_string()},
        }
    }

    #[test]
    fn test_public_is_visible_to_everyone() {
        assert!(scope().can_see(Visibility::Public, "stranger", "a9"));
    }

    #[test]
    fn test_buddies_visibility() {
        let scope = scope();
        assert!(scope.can_see(Visibility::Buddies, "friend", "a9"));
        assert!(!scope.can_see(Visibility::Buddies, "stranger", "a9"));
    }

    #[test]
    fn test_invite_only_visibility() {
        let scope = scope();
        assert!(scope.can_see(Visibility::InviteOnly, "stranger", "a1"));
        assert!(!scope.can_see(Visibility::InviteOnly, "stranger", "a2"));
        // Organizers always see their own
        assert!(scope.can_see(Visibility::InviteOnly, "me", "a2"));
    }
}
