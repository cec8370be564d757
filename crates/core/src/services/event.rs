//! Event service.
//!
//! Only `going` attendees hold a slot. A full event with the waitlist
//! enabled queues `going` requests as `waitlist`; each freed slot promotes
//! the earliest waitlisted attendee (one per release).

use crate::services::{
    activity::check_coordinates,
    audience::Audience,
    conversation::{ConversationService, provision_best_effort},
    membership::{
        derive_status, ensure_accepting, ensure_not_organizer, ensure_organizer,
        ensure_waitlist_allowed, status_drifted,
    },
    proximity::{GeoPoint, Nearby, NearbyQuery, bounding_box, filter_by_radius},
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tripmate_common::{AppError, AppResult, CommunityConfig, IdGenerator};
use tripmate_db::{
    entities::{
        conversation::ConversationKind,
        event,
        event_attendee::{self, RsvpStatus},
        shared::{SubjectKind, Visibility},
    },
    repositories::{EventRepository, UserRepository},
};
use validator::Validate;

const NEARBY_PREFETCH: u64 = 500;

/// Input for creating an event.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
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
    pub venue_name: Option<String>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    /// Maximum number of `going` attendees including the organizer.
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub waitlist_enabled: bool,

    /// Users to invite when `visibility` is invite-only.
    #[serde(default)]
    #[validate(length(max = 100))]
    pub invitee_ids: Vec<String>,
}

/// Where an event is in time. Independent of its capacity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Upcoming,
    Ongoing,
    Ended,
}

impl EventPhase {
    /// Phase of `event` at `now`.
    #[must_use]
    pub fn at(event: &event::Model, now: DateTime<Utc>) -> Self {
        if now < event.starts_at.with_timezone(&Utc) {
            Self::Upcoming
        } else if now < event.ends_at.with_timezone(&Utc) {
            Self::Ongoing
        } else {
            Self::Ended
        }
    }
}

/// Result of an RSVP: the event after the change and the caller's row.
#[derive(Debug, Clone, PartialEq)]
pub struct RsvpOutcome {
    pub event: event::Model,
    pub attendee: event_attendee::Model,
}

/// Event service for business logic.
#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    user_repo: UserRepository,
    audience: Audience,
    community: CommunityConfig,
    conversations: Option<ConversationService>,
    id_gen: IdGenerator,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        user_repo: UserRepository,
        audience: Audience,
        community: CommunityConfig,
    ) -> Self {
        Self {
            event_repo,
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

    /// Create an event. The organizer holds the first `going` slot.
    pub async fn create(
        &self,
        organizer_id: &str,
        input: CreateEventInput,
    ) -> AppResult<event::Model> {
        input.validate()?;
        check_coordinates(input.latitude, input.longitude)?;

        let now = Utc::now();
        if input.starts_at >= input.ends_at {
            return Err(AppError::Validation(
                "Event must end after it starts".to_string(),
            ));
        }
        if input.ends_at <= now {
            return Err(AppError::Validation(
                "Event must end in the future".to_string(),
            ));
        }

        self.user_repo.get_by_id(organizer_id).await?;

        let event_id = self.id_gen.generate();
        let model = event::ActiveModel {
            id: Set(event_id.clone()),
            organizer_id: Set(organizer_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            venue_name: Set(input.venue_name),
            starts_at: Set(input.starts_at.into()),
            ends_at: Set(input.ends_at.into()),
            capacity: Set(input.capacity),
            participant_count: Set(1),
            status: Set(derive_status(1, input.capacity)),
            visibility: Set(input.visibility),
            waitlist_enabled: Set(input.waitlist_enabled),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        let organizer = event_attendee::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.clone()),
            user_id: Set(organizer_id.to_string()),
            rsvp: Set(RsvpStatus::Going),
            is_organizer: Set(true),
            checked_in: Set(false),
            checked_in_at: Set(None),
            joined_at: Set(now.into()),
            updated_at: Set(None),
        };

        let invitations = if input.visibility == Visibility::InviteOnly {
            self.audience
                .prepare_invitations(
                    SubjectKind::Event,
                    &event_id,
                    organizer_id,
                    &input.invitee_ids,
                )
                .await?
        } else {
            Vec::new()
        };

        let event = self
            .event_repo
            .create_with_organizer(model, organizer, invitations)
            .await?;

        provision_best_effort(
            self.conversations.as_ref(),
            ConversationKind::Event,
            &event.id,
            organizer_id,
        )
        .await;

        tracing::info!(event_id = %event.id, organizer_id, "Created event");
        Ok(event)
    }

    /// Get an event by ID.
    pub async fn get(&self, event_id: &str) -> AppResult<event::Model> {
        self.event_repo.get_by_id(event_id).await
    }

    /// Join an event (RSVP `going`).
    pub async fn join(&self, user_id: &str, event_id: &str) -> AppResult<RsvpOutcome> {
        self.rsvp(user_id, event_id, RsvpStatus::Going).await
    }

    /// Set a user's RSVP.
    ///
    /// `going` claims a slot, falling back to the waitlist when the event is
    /// full and queues members. An explicit `waitlist` request is treated as
    /// `going`, so it only queues when no slot is free. Moving away from
    /// `going` releases the slot and promotes the next waitlisted attendee.
    pub async fn rsvp(
        &self,
        user_id: &str,
        event_id: &str,
        status: RsvpStatus,
    ) -> AppResult<RsvpOutcome> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let now = Utc::now();
        ensure_accepting(&event, now)?;

        let existing = self.event_repo.find_attendee(event_id, user_id).await?;

        if event.organizer_id == user_id && status != RsvpStatus::Going {
            return Err(AppError::Forbidden(
                "The organizer is always going; cancel the event instead".to_string(),
            ));
        }

        if existing.is_none() {
            self.user_repo.get_by_id(user_id).await?;
            self.audience
                .ensure_can_join(
                    SubjectKind::Event,
                    &event.id,
                    event.visibility,
                    &event.organizer_id,
                    user_id,
                )
                .await?;
        }

        let attendee = match (existing, status) {
            // Already holding a slot; a waitlist request changes nothing
            (Some(row), RsvpStatus::Going | RsvpStatus::Waitlist)
                if row.rsvp == RsvpStatus::Going =>
            {
                row
            }
            (Some(row), RsvpStatus::Waitlist) if row.rsvp == RsvpStatus::Waitlist => row,
            (existing, RsvpStatus::Going | RsvpStatus::Waitlist) => {
                self.claim_or_queue(&event, user_id, existing, now).await?
            }
            (Some(row), next) if row.rsvp == next => row,
            (Some(row), next) if row.rsvp == RsvpStatus::Going => {
                self.release(&event, &row, Some(next)).await?;
                self.event_repo
                    .find_attendee(event_id, user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Attendee {user_id}")))?
            }
            (Some(row), next) => self.event_repo.set_rsvp(row, next).await?,
            (None, next) => {
                self.event_repo
                    .insert_attendee(self.new_attendee(event_id, user_id, next, now))
                    .await?
            }
        };

        let event = self.event_repo.get_by_id(event_id).await?;
        tracing::info!(
            event_id,
            user_id,
            rsvp = ?attendee.rsvp,
            participant_count = event.participant_count,
            "Updated RSVP"
        );
        Ok(RsvpOutcome { event, attendee })
    }

    /// Leave an event. The organizer must cancel instead.
    pub async fn leave(&self, user_id: &str, event_id: &str) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_accepting(&event, Utc::now())?;
        ensure_not_organizer(&event, user_id)?;

        let row = self
            .event_repo
            .find_attendee(event_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attendee {user_id} in event {event_id}")))?;

        let removed = if row.rsvp == RsvpStatus::Going {
            self.release(&event, &row, None).await?
        } else {
            self.event_repo.remove_uncounted(&row.id).await?
        };
        if !removed {
            return Err(AppError::NotFound(format!(
                "Attendee {user_id} in event {event_id}"
            )));
        }

        let event = self.event_repo.get_by_id(event_id).await?;
        tracing::info!(
            event_id,
            user_id,
            participant_count = event.participant_count,
            "Left event"
        );
        Ok(event)
    }

    /// Cancel an event (organizer only). Cancelling twice is a no-op and
    /// nobody on the waitlist is promoted.
    pub async fn cancel(&self, actor_id: &str, event_id: &str) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_organizer(&event, actor_id)?;

        if self.event_repo.mark_cancelled(event_id).await? {
            tracing::info!(event_id, actor_id, "Cancelled event");
        }

        self.event_repo.get_by_id(event_id).await
    }

    /// Flag an attendee as checked in. The actor must hold the organizer row.
    pub async fn check_in(
        &self,
        actor_id: &str,
        event_id: &str,
        attendee_user_id: &str,
    ) -> AppResult<event_attendee::Model> {
        self.event_repo.get_by_id(event_id).await?;

        let is_organizer = self
            .event_repo
            .find_attendee(event_id, actor_id)
            .await?
            .is_some_and(|row| row.is_organizer);
        if !is_organizer {
            return Err(AppError::Forbidden(
                "Only the organizer can check attendees in".to_string(),
            ));
        }

        let row = self
            .event_repo
            .find_attendee(event_id, attendee_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Attendee {attendee_user_id} in event {event_id}"))
            })?;

        if row.checked_in {
            return Ok(row);
        }

        let row = self.event_repo.mark_checked_in(row).await?;
        tracing::info!(event_id, attendee_user_id, "Checked in attendee");
        Ok(row)
    }

    /// All attendee rows in join order.
    pub async fn list_attendees(&self, event_id: &str) -> AppResult<Vec<event_attendee::Model>> {
        self.event_repo.get_by_id(event_id).await?;
        self.event_repo.find_attendees(event_id).await
    }

    /// Waitlisted attendees in promotion order.
    pub async fn list_waitlist(&self, event_id: &str) -> AppResult<Vec<event_attendee::Model>> {
        self.event_repo.get_by_id(event_id).await?;
        self.event_repo.find_waitlist(event_id).await
    }

    /// Events within a radius that have not ended and `viewer_id` may see,
    /// nearest first.
    pub async fn list_nearby(
        &self,
        viewer_id: &str,
        query: NearbyQuery,
    ) -> AppResult<Vec<Nearby<event::Model>>> {
        let origin = GeoPoint::new(query.latitude, query.longitude)?;
        let radius_km = self.community.radius_km(query.radius_km);
        let limit = self.community.nearby_limit(query.limit);

        let candidates = self
            .event_repo
            .find_in_bounds(bounding_box(origin, radius_km), Utc::now(), NEARBY_PREFETCH)
            .await?;
        let scope = self
            .audience
            .viewer_scope(SubjectKind::Event, viewer_id)
            .await?;

        let visible = candidates
            .into_iter()
            .filter(|e| scope.can_see(e.visibility, &e.organizer_id, &e.id));
        let mut nearby = filter_by_radius(visible, origin, radius_km);
        nearby.truncate(limit);

        tracing::debug!(viewer_id, radius_km, count = nearby.len(), "Listed nearby events");
        Ok(nearby)
    }

    /// Recount `going` rows and repair the cached counter if it drifted.
    ///
    /// Returns `true` when a repair was made.
    pub async fn verify_attendee_count(&self, event_id: &str) -> AppResult<bool> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let actual = self.event_repo.count_going(event_id).await?;

        let count_matches = u64::try_from(event.participant_count).ok() == Some(actual);
        if count_matches && !status_drifted(&event) {
            return Ok(false);
        }

        tracing::warn!(
            event_id,
            cached = event.participant_count,
            actual,
            status = ?event.status,
            "Attendee count or status drifted; repairing"
        );
        self.event_repo.repair_count(event_id, actual).await?;
        Ok(true)
    }

    fn new_attendee(
        &self,
        event_id: &str,
        user_id: &str,
        rsvp: RsvpStatus,
        now: DateTime<Utc>,
    ) -> event_attendee::ActiveModel {
        event_attendee::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.to_string()),
            user_id: Set(user_id.to_string()),
            rsvp: Set(rsvp),
            is_organizer: Set(false),
            checked_in: Set(false),
            checked_in_at: Set(None),
            joined_at: Set(now.into()),
            updated_at: Set(None),
        }
    }

    /// Take a slot for a user without one, or queue them.
    async fn claim_or_queue(
        &self,
        event: &event::Model,
        user_id: &str,
        existing: Option<event_attendee::Model>,
        now: DateTime<Utc>,
    ) -> AppResult<event_attendee::Model> {
        let admitted = match &existing {
            Some(row) => {
                self.event_repo
                    .upgrade_to_going(&event.id, row.clone())
                    .await?
            }
            None => {
                let row = self.new_attendee(&event.id, user_id, RsvpStatus::Going, now);
                self.event_repo.admit_attendee(&event.id, row).await?
            }
        };
        if let Some(row) = admitted {
            return Ok(row);
        }

        // Re-read so a concurrent cancel reports as a state error
        let current = self.event_repo.get_by_id(&event.id).await?;
        ensure_waitlist_allowed(&current, now)?;

        match existing {
            Some(row) if row.rsvp == RsvpStatus::Waitlist => Ok(row),
            Some(row) => self.event_repo.enqueue_waitlist(row).await,
            None => {
                let row = self.new_attendee(&event.id, user_id, RsvpStatus::Waitlist, now);
                self.event_repo.insert_attendee(row).await
            }
        }
    }

    /// Release a `going` slot, promoting from the waitlist when enabled.
    async fn release(
        &self,
        event: &event::Model,
        row: &event_attendee::Model,
        next: Option<RsvpStatus>,
    ) -> AppResult<bool> {
        let release = self
            .event_repo
            .release_attendee(&event.id, &row.id, next, event.waitlist_enabled)
            .await?;

        if let Some(promoted) = &release.promoted {
            tracing::info!(
                event_id = %event.id,
                user_id = %promoted.user_id,
                "Promoted attendee from waitlist"
            );
        }
        Ok(release.released)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::user::{RegisterInput, UserService};
    use chrono::Duration;
    use std::sync::Arc;
    use tripmate_db::{
        entities::shared::CapacityStatus,
        repositories::{BuddyRepository, InvitationRepository},
        test_utils::TestDatabase,
    };

    async fn setup() -> (EventService, UserService) {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        let user_repo = UserRepository::new(Arc::clone(&db));
        let audience = Audience::new(
            BuddyRepository::new(Arc::clone(&db)),
            InvitationRepository::new(Arc::clone(&db)),
            user_repo.clone(),
        );
        let events = EventService::new(
            EventRepository::new(db),
            user_repo.clone(),
            audience,
            CommunityConfig::default(),
        );
        (events, UserService::new(user_repo))
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

    fn input(capacity: Option<i32>, waitlist_enabled: bool) -> CreateEventInput {
        let now = Utc::now();
        CreateEventInput {
            title: "Night market walk".to_string(),
            description: None,
            category: None,
            latitude: Some(13.75),
            longitude: Some(100.5),
            venue_name: Some("Chinatown".to_string()),
            starts_at: now + Duration::hours(2),
            ends_at: now + Duration::hours(5),
            capacity,
            visibility: Visibility::Public,
            waitlist_enabled,
            invitee_ids: vec![],
        }
    }

    async fn pause() {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn test_capacity_one_waitlist_then_cancel() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(Some(1), true)).await.unwrap();
        assert_eq!(event.status, CapacityStatus::Full);

        let outcome = events.rsvp(&x, &event.id, RsvpStatus::Going).await.unwrap();
        assert_eq!(outcome.attendee.rsvp, RsvpStatus::Waitlist);
        assert_eq!(outcome.event.participant_count, 1);

        assert!(matches!(
            events.leave(&org, &event.id).await,
            Err(AppError::Forbidden(_))
        ));

        let cancelled = events.cancel(&org, &event.id).await.unwrap();
        assert_eq!(cancelled.status, CapacityStatus::Cancelled);
        assert_eq!(cancelled.participant_count, 1);

        let waitlist = events.list_waitlist(&event.id).await.unwrap();
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].user_id, x);
        assert!(matches!(
            events.leave(&x, &event.id).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_promotes_earliest_waitlisted_only() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let a = register(&users, "a").await;
        let w1 = register(&users, "w1").await;
        let w2 = register(&users, "w2").await;

        let event = events.create(&org, input(Some(2), true)).await.unwrap();
        let outcome = events.join(&a, &event.id).await.unwrap();
        assert_eq!(outcome.attendee.rsvp, RsvpStatus::Going);
        assert_eq!(outcome.event.status, CapacityStatus::Full);

        let first = events.join(&w1, &event.id).await.unwrap();
        pause().await;
        let second = events.join(&w2, &event.id).await.unwrap();
        assert_eq!(first.attendee.rsvp, RsvpStatus::Waitlist);
        assert_eq!(second.attendee.rsvp, RsvpStatus::Waitlist);

        let event = events.leave(&a, &event.id).await.unwrap();
        assert_eq!(event.participant_count, 2);
        assert_eq!(event.status, CapacityStatus::Full);

        let attendees = events.list_attendees(&event.id).await.unwrap();
        let rsvp_of = |user: &str| {
            attendees
                .iter()
                .find(|row| row.user_id == user)
                .map(|row| row.rsvp)
        };
        assert_eq!(rsvp_of(&w1), Some(RsvpStatus::Going));
        assert_eq!(rsvp_of(&w2), Some(RsvpStatus::Waitlist));
        assert_eq!(rsvp_of(&a), None);

        assert!(!events.verify_attendee_count(&event.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_declining_going_attendee_promotes_waitlisted() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let a = register(&users, "a").await;
        let w = register(&users, "w").await;

        let event = events.create(&org, input(Some(2), true)).await.unwrap();
        events.join(&a, &event.id).await.unwrap();
        let queued = events.join(&w, &event.id).await.unwrap();
        assert_eq!(queued.attendee.rsvp, RsvpStatus::Waitlist);

        let declined = events.rsvp(&a, &event.id, RsvpStatus::Declined).await.unwrap();
        assert_eq!(declined.attendee.rsvp, RsvpStatus::Declined);
        assert_eq!(declined.event.participant_count, 2);
        assert_eq!(declined.event.status, CapacityStatus::Full);

        let attendees = events.list_attendees(&event.id).await.unwrap();
        let w_row = attendees.iter().find(|row| row.user_id == w).unwrap();
        assert_eq!(w_row.rsvp, RsvpStatus::Going);
        assert!(events.list_waitlist(&event.id).await.unwrap().is_empty());
        assert_eq!(events.get(&event.id).await.unwrap().participant_count, 2);
    }

    #[tokio::test]
    async fn test_full_without_waitlist_is_capacity_error() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(Some(1), false)).await.unwrap();
        assert!(matches!(
            events.join(&x, &event.id).await,
            Err(AppError::Capacity(_))
        ));
        assert!(events.list_waitlist(&event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_twice_then_join_fails() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(None, false)).await.unwrap();
        for _ in 0..2 {
            let cancelled = events.cancel(&org, &event.id).await.unwrap();
            assert_eq!(cancelled.status, CapacityStatus::Cancelled);
            assert!(matches!(
                events.join(&x, &event.id).await,
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rsvp_transitions_adjust_count() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(Some(3), false)).await.unwrap();

        let maybe = events.rsvp(&x, &event.id, RsvpStatus::Maybe).await.unwrap();
        assert_eq!(maybe.attendee.rsvp, RsvpStatus::Maybe);
        assert_eq!(maybe.event.participant_count, 1);

        let going = events.rsvp(&x, &event.id, RsvpStatus::Going).await.unwrap();
        assert_eq!(going.attendee.rsvp, RsvpStatus::Going);
        assert_eq!(going.event.participant_count, 2);

        // A waitlist request while holding a slot changes nothing
        let same = events.rsvp(&x, &event.id, RsvpStatus::Waitlist).await.unwrap();
        assert_eq!(same.attendee.rsvp, RsvpStatus::Going);
        assert_eq!(same.event.participant_count, 2);

        let declined = events.rsvp(&x, &event.id, RsvpStatus::Declined).await.unwrap();
        assert_eq!(declined.attendee.rsvp, RsvpStatus::Declined);
        assert_eq!(declined.event.participant_count, 1);

        // Explicit waitlist with free slots is treated as going
        let back = events.rsvp(&x, &event.id, RsvpStatus::Waitlist).await.unwrap();
        assert_eq!(back.attendee.rsvp, RsvpStatus::Going);
        assert_eq!(back.event.participant_count, 2);

        assert!(matches!(
            events.rsvp(&org, &event.id, RsvpStatus::Maybe).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_leaving_non_counted_row_keeps_count() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(None, false)).await.unwrap();
        events.rsvp(&x, &event.id, RsvpStatus::Maybe).await.unwrap();

        let event = events.leave(&x, &event.id).await.unwrap();
        assert_eq!(event.participant_count, 1);
        assert!(matches!(
            events.leave(&x, &event.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_check_in_requires_organizer() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let x = register(&users, "x").await;

        let event = events.create(&org, input(None, false)).await.unwrap();
        events.join(&x, &event.id).await.unwrap();

        assert!(matches!(
            events.check_in(&x, &event.id, &x).await,
            Err(AppError::Forbidden(_))
        ));

        let row = events.check_in(&org, &event.id, &x).await.unwrap();
        assert!(row.checked_in);
        assert!(row.checked_in_at.is_some());
        assert_eq!(events.get(&event.id).await.unwrap().participant_count, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_times() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;

        let mut bad = input(None, false);
        std::mem::swap(&mut bad.starts_at, &mut bad.ends_at);
        assert!(matches!(
            events.create(&org, bad).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_nearby_events() {
        let (events, users) = setup().await;
        let org = register(&users, "org").await;
        let viewer = register(&users, "viewer").await;

        let event = events.create(&org, input(None, false)).await.unwrap();
        let query = NearbyQuery {
            latitude: 13.76,
            longitude: 100.5,
            radius_km: Some(5.0),
            limit: Some(10),
        };

        let nearby = events.list_nearby(&viewer, query).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].item.id, event.id);
    }

    #[test]
    fn test_event_phase() {
        let now = Utc::now();
        let event = event::Model {
            id: "e1".to_string(),
            organizer_id: "org".to_string(),
            title: "t".to_string(),
            description: None,
            category: None,
            latitude: None,
            longitude: None,
            venue_name: None,
            starts_at: (now + Duration::hours(1)).into(),
            ends_at: (now + Duration::hours(2)).into(),
            capacity: None,
            participant_count: 1,
            status: CapacityStatus::Open,
            visibility: Visibility::Public,
            waitlist_enabled: false,
            created_at: now.into(),
            updated_at: None,
        };

        assert_eq!(EventPhase::at(&event, now), EventPhase::Upcoming);
        assert_eq!(EventPhase::at(&event, now + Duration::minutes(90)), EventPhase::Ongoing);
        assert_eq!(EventPhase::at(&event, now + Duration::hours(3)), EventPhase::Ended);
    }
}
