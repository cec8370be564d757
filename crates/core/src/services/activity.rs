//! Activity service.
//!
//! Activities have a hard capacity: a full activity rejects new members
//! with a capacity error and never queues them.

use crate::services::{
    audience::Audience,
    conversation::{ConversationService, provision_best_effort},
    membership::{
        derive_status, ensure_accepting, ensure_not_organizer, ensure_organizer, status_drifted,
    },
    proximity::{GeoPoint, Nearby, NearbyQuery, bounding_box, filter_by_radius},
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tripmate_common::{AppError, AppResult, CommunityConfig, IdGenerator};
use tripmate_db::{
    entities::{
        activity, activity_participant,
        conversation::ConversationKind,
        shared::{SubjectKind, Visibility},
    },
    repositories::{ActivityRepository, UserRepository},
};
use validator::Validate;

/// Rows fetched, nearest first, by the bounding-box prefilter per nearby listing.
const NEARBY_PREFETCH: u64 = 500;

/// Input for creating an activity.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 4000))]
    pub description: Option<String>,

    #[validate(length(max = 64))]
    pub category: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[validate(length(max = 256))]
    pub location_name: Option<String>,

    /// Maximum number of participants including the creator.
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,

    #[serde(default)]
    pub visibility: Visibility,

    pub expires_at: DateTime<Utc>,

    /// Users to invite when `visibility` is invite-only.
    #[serde(default)]
    #[validate(length(max = 100))]
    pub invitee_ids: Vec<String>,
}

/// Latitude and longitude must be given together.
pub(crate) fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> AppResult<()> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).map(|_| ()),
        (None, None) => Ok(()),
        _ => Err(AppError::Validation(
            "Latitude and longitude must be given together".to_string(),
        )),
    }
}

/// Activity service for business logic.
#[derive(Clone)]
pub struct ActivityService {
    activity_repo: ActivityRepository,
    user_repo: UserRepository,
    audience: Audience,
    community: CommunityConfig,
    conversations: Option<ConversationService>,
    id_gen: IdGenerator,
}

impl ActivityService {
    /// Create a new activity service.
    #[must_use]
    pub const fn new(
        activity_repo: ActivityRepository,
        user_repo: UserRepository,
        audience: Audience,
        community: CommunityConfig,
    ) -> Self {
        Self {
            activity_repo,
            user_repo,
            audience,
            community,
            conversations: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the conversation provisioner used on creation.
    pub fn set_conversations(&mut self, conversations: ConversationService) {
        self.conversations = Some(conversations);
    }

    /// Create an activity. The creator joins as organizer.
    pub async fn create(
        &self,
        creator_id: &str,
        input: CreateActivityInput,
    ) -> AppResult<activity::Model> {
        input.validate()?;
        check_coordinates(input.latitude, input.longitude)?;

        let now = Utc::now();
        if input.expires_at <= now {
            return Err(AppError::Validation(
                "Activity must expire in the future".to_string(),
            ));
        }

        self.user_repo.get_by_id(creator_id).await?;

        let activity_id = self.id_gen.generate();
        let model = activity::ActiveModel {
            id: Set(activity_id.clone()),
            creator_id: Set(creator_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            location_name: Set(input.location_name),
            capacity: Set(input.capacity),
            participant_count: Set(1),
            status: Set(derive_status(1, input.capacity)),
            visibility: Set(input.visibility),
            expires_at: Set(input.expires_at.into()),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        let organizer = activity_participant::ActiveModel {
            id: Set(self.id_gen.generate()),
            activity_id: Set(activity_id.clone()),
            user_id: Set(creator_id.to_string()),
            is_organizer: Set(true),
            joined_at: Set(now.into()),
        };

        let invitations = if input.visibility == Visibility::InviteOnly {
            self.audience
                .prepare_invitations(
                    SubjectKind::Activity,
                    &activity_id,
                    creator_id,
                    &input.invitee_ids,
                )
                .await?
        } else {
            Vec::new()
        };

        let activity = self
            .activity_repo
            .create_with_organizer(model, organizer, invitations)
            .await?;

        provision_best_effort(
            self.conversations.as_ref(),
            ConversationKind::Activity,
            &activity.id,
            creator_id,
        )
        .await;

        tracing::info!(activity_id = %activity.id, creator_id, "Created activity");
        Ok(activity)
    }

    /// Get an activity by ID.
    pub async fn get(&self, activity_id: &str) -> AppResult<activity::Model> {
        self.activity_repo.get_by_id(activity_id).await
    }

    /// Join an activity.
    pub async fn join(&self, user_id: &str, activity_id: &str) -> AppResult<activity::Model> {
        let activity = self.activity_repo.get_by_id(activity_id).await?;
        let now = Utc::now();
        ensure_accepting(&activity, now)?;

        if self
            .activity_repo
            .find_participant(activity_id, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(
                "Already joined this activity".to_string(),
            ));
        }

        self.user_repo.get_by_id(user_id).await?;
        self.audience
            .ensure_can_join(
                SubjectKind::Activity,
                &activity.id,
                activity.visibility,
                &activity.creator_id,
                user_id,
            )
            .await?;

        let participant = activity_participant::ActiveModel {
            id: Set(self.id_gen.generate()),
            activity_id: Set(activity_id.to_string()),
            user_id: Set(user_id.to_string()),
            is_organizer: Set(false),
            joined_at: Set(now.into()),
        };

        if self
            .activity_repo
            .admit_participant(activity_id, participant)
            .await?
            .is_none()
        {
            // Re-read so a concurrent cancel reports as a state error
            let current = self.activity_repo.get_by_id(activity_id).await?;
            ensure_accepting(&current, now)?;
            return Err(AppError::Capacity(format!(
                "Activity {activity_id} is full"
            )));
        }

        let activity = self.activity_repo.get_by_id(activity_id).await?;
        tracing::info!(
            activity_id,
            user_id,
            participant_count = activity.participant_count,
            "Joined activity"
        );
        Ok(activity)
    }

    /// Leave an activity. The creator must cancel instead.
    pub async fn leave(&self, user_id: &str, activity_id: &str) -> AppResult<activity::Model> {
        let activity = self.activity_repo.get_by_id(activity_id).await?;
        ensure_accepting(&activity, Utc::now())?;
        ensure_not_organizer(&activity, user_id)?;

        if !self
            .activity_repo
            .remove_participant(activity_id, user_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "Participant {user_id} in activity {activity_id}"
            )));
        }

        let activity = self.activity_repo.get_by_id(activity_id).await?;
        tracing::info!(
            activity_id,
            user_id,
            participant_count = activity.participant_count,
            "Left activity"
        );
        Ok(activity)
    }

    /// Cancel an activity (creator only). Cancelling twice is a no-op.
    pub async fn cancel(&self, actor_id: &str, activity_id: &str) -> AppResult<activity::Model> {
        let activity = self.activity_repo.get_by_id(activity_id).await?;
        ensure_organizer(&activity, actor_id)?;

        if self.activity_repo.mark_cancelled(activity_id).await? {
            tracing::info!(activity_id, actor_id, "Cancelled activity");
        }

        self.activity_repo.get_by_id(activity_id).await
    }

    /// Participants in join order.
    pub async fn list_participants(
        &self,
        activity_id: &str,
    ) -> AppResult<Vec<activity_participant::Model>> {
        self.activity_repo.get_by_id(activity_id).await?;
        self.activity_repo.find_participants(activity_id).await
    }

    /// Live activities within a radius that `viewer_id` may see, nearest first.
    pub async fn list_nearby(
        &self,
        viewer_id: &str,
        query: NearbyQuery,
    ) -> AppResult<Vec<Nearby<activity::Model>>> {
        let origin = GeoPoint::new(query.latitude, query.longitude)?;
        let radius_km = self.community.radius_km(query.radius_km);
        let limit = self.community.nearby_limit(query.limit);

        let candidates = self
            .activity_repo
            .find_in_bounds(bounding_box(origin, radius_km), Utc::now(), NEARBY_PREFETCH)
            .await?;
        let scope = self
            .audience
            .viewer_scope(SubjectKind::Activity, viewer_id)
            .await?;

        let visible = candidates
            .into_iter()
            .filter(|a| scope.can_see(a.visibility, &a.creator_id, &a.id));
        let mut nearby = filter_by_radius(visible, origin, radius_km);
        nearby.truncate(limit);

        tracing::debug!(viewer_id, radius_km, count = nearby.len(), "Listed nearby activities");
        Ok(nearby)
    }

    /// Recount participants and repair the cached counter if it drifted.
    ///
    /// Returns `true` when a repair was made.
    pub async fn verify_participant_count(&self, activity_id: &str) -> AppResult<bool> {
        let activity = self.activity_repo.get_by_id(activity_id).await?;
        let actual = self.activity_repo.count_participants(activity_id).await?;

        let count_matches = u64::try_from(activity.participant_count).ok() == Some(actual);
        if count_matches && !status_drifted(&activity) {
            return Ok(false);
        }

        tracing::warn!(
            activity_id,
            cached = activity.participant_count,
            actual,
            status = ?activity.status,
            "Participant count or status drifted; repairing"
        );
        self.activity_repo.repair_count(activity_id, actual).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::{
        buddy::BuddyService,
        conversation::StoredConversations,
        user::{RegisterInput, UserService},
    };
    use chrono::Duration;
    use std::sync::Arc;
    use tripmate_db::{
        entities::shared::CapacityStatus,
        repositories::{
            BlockingRepository, BuddyRepository, ConversationRepository, InvitationRepository,
        },
        test_utils::TestDatabase,
    };

    struct Fixture {
        activities: ActivityService,
        audience: Audience,
        users: UserService,
        buddies: BuddyService,
        conversations: StoredConversations,
    }

    async fn setup() -> Fixture {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        let user_repo = UserRepository::new(Arc::clone(&db));
        let buddy_repo = BuddyRepository::new(Arc::clone(&db));
        let audience = Audience::new(
            buddy_repo.clone(),
            InvitationRepository::new(Arc::clone(&db)),
            user_repo.clone(),
        );
        let conversations = StoredConversations::new(ConversationRepository::new(Arc::clone(&db)));

        let mut activities = ActivityService::new(
            ActivityRepository::new(Arc::clone(&db)),
            user_repo.clone(),
            audience.clone(),
            CommunityConfig::default(),
        );
        activities.set_conversations(Arc::new(conversations.clone()));

        Fixture {
            activities,
            audience,
            users: UserService::new(user_repo.clone()),
            buddies: BuddyService::new(
                buddy_repo,
                BlockingRepository::new(Arc::clone(&db)),
                user_repo,
            ),
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

    fn input(capacity: Option<i32>) -> CreateActivityInput {
        CreateActivityInput {
            title: "Sunset hike".to_string(),
            description: None,
            category: Some("outdoors".to_string()),
            latitude: Some(0.0),
            longitude: Some(0.0),
            location_name: None,
            capacity,
            visibility: Visibility::Public,
            expires_at: Utc::now() + Duration::hours(6),
            invitee_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_capacity_two_lifecycle() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let b = register(&f.users, "bee").await;
        let c = register(&f.users, "cee").await;

        let activity = f.activities.create(&creator, input(Some(2))).await.unwrap();
        assert_eq!(activity.participant_count, 1);
        assert_eq!(activity.status, CapacityStatus::Open);

        let activity = f.activities.join(&b, &activity.id).await.unwrap();
        assert_eq!(activity.participant_count, 2);
        assert_eq!(activity.status, CapacityStatus::Full);

        assert!(matches!(
            f.activities.join(&c, &activity.id).await,
            Err(AppError::Capacity(_))
        ));
        assert_eq!(f.activities.get(&activity.id).await.unwrap().participant_count, 2);

        let activity = f.activities.leave(&b, &activity.id).await.unwrap();
        assert_eq!(activity.participant_count, 1);
        assert_eq!(activity.status, CapacityStatus::Open);

        let activity = f.activities.join(&c, &activity.id).await.unwrap();
        assert_eq!(activity.participant_count, 2);
        assert_eq!(activity.status, CapacityStatus::Full);

        assert!(!f.activities.verify_participant_count(&activity.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_creation_provisions_conversation() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;

        let activity = f.activities.create(&creator, input(None)).await.unwrap();
        let participants = f.activities.list_participants(&activity.id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert!(participants[0].is_organizer);

        assert!(
            f.conversations
                .find(ConversationKind::Activity, &activity.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_capacity_one_starts_full() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;

        let activity = f.activities.create(&creator, input(Some(1))).await.unwrap();
        assert_eq!(activity.status, CapacityStatus::Full);
    }

    #[tokio::test]
    async fn test_organizer_cannot_leave() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let activity = f.activities.create(&creator, input(None)).await.unwrap();

        assert!(matches!(
            f.activities.leave(&creator, &activity.id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_join_twice_and_leave_without_joining() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let b = register(&f.users, "bee").await;
        let activity = f.activities.create(&creator, input(None)).await.unwrap();

        assert!(matches!(
            f.activities.leave(&b, &activity.id).await,
            Err(AppError::NotFound(_))
        ));
        f.activities.join(&b, &activity.id).await.unwrap();
        assert!(matches!(
            f.activities.join(&b, &activity.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_terminal() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let b = register(&f.users, "bee").await;
        let activity = f.activities.create(&creator, input(Some(5))).await.unwrap();

        assert!(matches!(
            f.activities.cancel(&b, &activity.id).await,
            Err(AppError::Forbidden(_))
        ));

        for _ in 0..2 {
            let cancelled = f.activities.cancel(&creator, &activity.id).await.unwrap();
            assert_eq!(cancelled.status, CapacityStatus::Cancelled);
            assert!(matches!(
                f.activities.join(&b, &activity.id).await,
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_activity() {
        let f = setup().await;
        let b = register(&f.users, "bee").await;
        assert!(matches!(
            f.activities.join(&b, "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_past_expiry_and_half_coordinates() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;

        let mut past = input(None);
        past.expires_at = Utc::now() - Duration::minutes(1);
        assert!(matches!(
            f.activities.create(&creator, past).await,
            Err(AppError::Validation(_))
        ));

        let mut half = input(None);
        half.longitude = None;
        assert!(matches!(
            f.activities.create(&creator, half).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invite_only_and_buddies_visibility() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let guest = register(&f.users, "guest").await;
        let stranger = register(&f.users, "stranger").await;

        let mut private = input(None);
        private.visibility = Visibility::InviteOnly;
        private.invitee_ids = vec![
            guest.clone(),
            guest.clone(),
            creator.clone(),
            "ghost".to_string(),
        ];
        let private = f.activities.create(&creator, private).await.unwrap();

        let invited = f
            .audience
            .invitations(SubjectKind::Activity, &private.id)
            .await
            .unwrap();
        assert_eq!(invited.len(), 1);
        assert_eq!(invited[0].invitee_id, guest);

        assert!(matches!(
            f.activities.join(&stranger, &private.id).await,
            Err(AppError::Forbidden(_))
        ));
        f.activities.join(&guest, &private.id).await.unwrap();

        let mut buddies_only = input(None);
        buddies_only.visibility = Visibility::Buddies;
        let buddies_only = f.activities.create(&creator, buddies_only).await.unwrap();

        assert!(matches!(
            f.activities.join(&stranger, &buddies_only.id).await,
            Err(AppError::Forbidden(_))
        ));
        let conn = f.buddies.send_request(&stranger, &creator).await.unwrap();
        f.buddies.accept_request(&creator, &conn.id).await.unwrap();
        f.activities.join(&stranger, &buddies_only.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_invitee_list_writes_nothing() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;

        let mut crowded = input(None);
        crowded.visibility = Visibility::InviteOnly;
        crowded.invitee_ids = (0..=100).map(|i| format!("guest{i}")).collect();
        assert!(matches!(
            f.activities.create(&creator, crowded).await,
            Err(AppError::Validation(_))
        ));

        let query = NearbyQuery {
            latitude: 0.0,
            longitude: 0.0,
            radius_km: Some(1.0),
            limit: None,
        };
        assert!(f.activities.list_nearby(&creator, query).await.unwrap().is_empty());

        // A retry within the limit creates exactly one activity
        let mut retry = input(None);
        retry.visibility = Visibility::InviteOnly;
        retry.invitee_ids = (0..100).map(|i| format!("guest{i}")).collect();
        f.activities.create(&creator, retry).await.unwrap();
        assert_eq!(f.activities.list_nearby(&creator, query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_nearby() {
        let f = setup().await;
        let creator = register(&f.users, "creator").await;
        let viewer = register(&f.users, "viewer").await;

        let here = f.activities.create(&creator, input(None)).await.unwrap();

        let mut far = input(None);
        far.longitude = Some(1.0);
        f.activities.create(&creator, far).await.unwrap();

        let mut nowhere = input(None);
        nowhere.latitude = None;
        nowhere.longitude = None;
        f.activities.create(&creator, nowhere).await.unwrap();

        let mut hidden = input(None);
        hidden.visibility = Visibility::InviteOnly;
        f.activities.create(&creator, hidden).await.unwrap();

        let query = NearbyQuery {
            latitude: 0.0,
            longitude: 0.09,
            radius_km: Some(10.0),
            limit: None,
        };
        let nearby = f.activities.list_nearby(&viewer, query).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].item.id, here.id);
        assert!(nearby[0].distance_km > 9.9 && nearby[0].distance_km < 10.1);

        // Cancelled activities drop out
        f.activities.cancel(&creator, &here.id).await.unwrap();
        assert!(f.activities.list_nearby(&viewer, query).await.unwrap().is_empty());
    }
}
