//! Capacity and waitlist rules shared by activities and events.
//!
//! The persistence side (atomic slot claims, FIFO promotion) lives in the
//! repositories; this module decides what a request is allowed to do.

use chrono::{DateTime, Utc};
use tripmate_common::{AppError, AppResult};
use tripmate_db::entities::{activity, event, shared::CapacityStatus};

/// Read access to the fields every capacity-constrained entity shares.
pub trait CapacityEntity {
    /// Entity ID.
    fn entity_id(&self) -> &str;
    /// Creator (activity) or organizer (event).
    fn organizer_id(&self) -> &str;
    /// Maximum number of active participants, if bounded.
    fn capacity(&self) -> Option<i32>;
    /// Cached number of active participants.
    fn participant_count(&self) -> i32;
    /// Stored membership status.
    fn status(&self) -> CapacityStatus;
    /// After this instant nobody can join or leave.
    fn closes_at(&self) -> DateTime<Utc>;
    /// Whether a full entity queues new members instead of rejecting them.
    fn waitlist_enabled(&self) -> bool {
        false
    }
    /// Human readable kind for error messages.
    fn kind(&self) -> &'static str;
}

impl CapacityEntity for activity::Model {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn organizer_id(&self) -> &str {
        &self.creator_id
    }
    fn capacity(&self) -> Option<i32> {
        self.capacity
    }
    fn participant_count(&self) -> i32 {
        self.participant_count
    }
    fn status(&self) -> CapacityStatus {
        self.status
    }
    fn closes_at(&self) -> DateTime<Utc> {
        self.expires_at.with_timezone(&Utc)
    }
    fn kind(&self) -> &'static str {
        "Activity"
    }
}

impl CapacityEntity for event::Model {
    fn entity_id(&self) -> &str {
        &self.id
    }
    fn organizer_id(&self) -> &str {
        &self.organizer_id
    }
    fn capacity(&self) -> Option<i32> {
        self.capacity
    }
    fn participant_count(&self) -> i32 {
        self.participant_count
    }
    fn status(&self) -> CapacityStatus {
        self.status
    }
    fn closes_at(&self) -> DateTime<Utc> {
        self.ends_at.with_timezone(&Utc)
    }
    fn waitlist_enabled(&self) -> bool {
        self.waitlist_enabled
    }
    fn kind(&self) -> &'static str {
        "Event"
    }
}

/// Status implied by a participant count. Cancellation is stored
/// separately and always wins.
#[must_use]
pub fn derive_status(participant_count: i32, capacity: Option<i32>) -> CapacityStatus {
    match capacity {
        Some(cap) if participant_count >= cap => CapacityStatus::Full,
        _ => CapacityStatus::Open,
    }
}

/// Whether the cached count has reached capacity.
#[must_use]
pub fn is_full<E: CapacityEntity>(entity: &E) -> bool {
    derive_status(entity.participant_count(), entity.capacity()) == CapacityStatus::Full
}

/// Whether the stored open/full status disagrees with the cached count.
#[must_use]
pub fn status_drifted<E: CapacityEntity>(entity: &E) -> bool {
    match entity.status() {
        CapacityStatus::Cancelled => false,
        CapacityStatus::Full => !is_full(entity),
        CapacityStatus::Open => is_full(entity),
    }
}

/// Fail unless the entity still accepts membership changes.
pub fn ensure_accepting<E: CapacityEntity>(entity: &E, now: DateTime<Utc>) -> AppResult<()> {
    if entity.status() == CapacityStatus::Cancelled {
        return Err(AppError::InvalidState(format!(
            "{} {} is cancelled",
            entity.kind(),
            entity.entity_id()
        )));
    }
    if now >= entity.closes_at() {
        return Err(AppError::InvalidState(format!(
            "{} {} has already ended",
            entity.kind(),
            entity.entity_id()
        )));
    }
    Ok(())
}

/// Fail unless `actor_id` organizes the entity.
pub fn ensure_organizer<E: CapacityEntity>(entity: &E, actor_id: &str) -> AppResult<()> {
    if entity.organizer_id() == actor_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the organizer can manage {} {}",
            entity.kind(),
            entity.entity_id()
        )))
    }
}

/// Fail if `user_id` organizes the entity (organizers cancel, never leave).
pub fn ensure_not_organizer<E: CapacityEntity>(entity: &E, user_id: &str) -> AppResult<()> {
    if entity.organizer_id() == user_id {
        Err(AppError::Forbidden(format!(
            "The organizer cannot leave {} {}; cancel it instead",
            entity.kind(),
            entity.entity_id()
        )))
    } else {
        Ok(())
    }
}

/// Check whether a request whose slot claim failed may be waitlisted.
///
/// `entity` must be freshly loaded: a concurrent cancel shows up here as a
/// state error rather than a capacity error.
pub fn ensure_waitlist_allowed<E: CapacityEntity>(entity: &E, now: DateTime<Utc>) -> AppResult<()> {
    ensure_accepting(entity, now)?;
    if entity.waitlist_enabled() {
        Ok(())
    } else {
        Err(AppError::Capacity(format!(
            "{} {} is full",
            entity.kind(),
            entity.entity_id()
        )))
    }
}
