//! Event repository.
//!
//! Only `going` attendees hold a slot. Every transition into or out of
//! `going` runs in one transaction with the counter update, and waitlist
//! promotion happens inside the same transaction as the release that
//! freed the slot.

use std::sync::Arc;

use super::{GeoBounds, invitation::insert_invitations};
use crate::entities::{
    Event, EventAttendee, event,
    event_attendee::{self, RsvpStatus},
    invitation,
    shared::CapacityStatus,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::Expr,
};
use tripmate_common::{AppError, AppResult};

/// Outcome of releasing a `going` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotRelease {
    /// Whether a `going` row was found and released.
    pub released: bool,
    /// Waitlisted attendee moved to `going` by the release, if any.
    pub promoted: Option<event_attendee::Model>,
}

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an event by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event: {id}")))
    }

    /// Insert an event together with its organizer's attendee row and any
    /// invitations, in one transaction.
    pub async fn create_with_organizer(
        &self,
        model: event::ActiveModel,
        organizer: event_attendee::ActiveModel,
        invitations: Vec<invitation::ActiveModel>,
    ) -> AppResult<event::Model> {
        let txn = self.begin().await?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        organizer
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_invitations(&txn, invitations).await?;

        commit(txn).await?;
        Ok(created)
    }

    /// Claim a slot and insert a new `going` row.
    ///
    /// Returns `None` without writing anything when no slot is free.
    pub async fn admit_attendee(
        &self,
        event_id: &str,
        attendee: event_attendee::ActiveModel,
    ) -> AppResult<Option<event_attendee::Model>> {
        let txn = self.begin().await?;

        if !claim_slot(&txn, event_id).await? {
            rollback(txn).await?;
            return Ok(None);
        }

        let inserted = attendee
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sync_status(&txn, event_id).await?;

        commit(txn).await?;
        Ok(Some(inserted))
    }

    /// Claim a slot and move an existing non-counting row to `going`.
    pub async fn upgrade_to_going(
        &self,
        event_id: &str,
        attendee: event_attendee::Model,
    ) -> AppResult<Option<event_attendee::Model>> {
        let txn = self.begin().await?;

        if !claim_slot(&txn, event_id).await? {
            rollback(txn).await?;
            return Ok(None);
        }

        let mut active: event_attendee::ActiveModel = attendee.into();
        active.rsvp = Set(RsvpStatus::Going);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sync_status(&txn, event_id).await?;

        commit(txn).await?;
        Ok(Some(updated))
    }

    /// Insert a row that does not hold a slot (`maybe`, `waitlist`, `declined`).
    pub async fn insert_attendee(
        &self,
        attendee: event_attendee::ActiveModel,
    ) -> AppResult<event_attendee::Model> {
        attendee
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Change a row between non-counting states.
    pub async fn set_rsvp(
        &self,
        attendee: event_attendee::Model,
        rsvp: RsvpStatus,
    ) -> AppResult<event_attendee::Model> {
        let mut active: event_attendee::ActiveModel = attendee.into();
        active.rsvp = Set(rsvp);
        active.updated_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move a non-counting row to the back of the waitlist.
    pub async fn enqueue_waitlist(
        &self,
        attendee: event_attendee::Model,
    ) -> AppResult<event_attendee::Model> {
        let now = Utc::now();
        let mut active: event_attendee::ActiveModel = attendee.into();
        active.rsvp = Set(RsvpStatus::Waitlist);
        active.joined_at = Set(now.into());
        active.updated_at = Set(Some(now.into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a row that does not hold a slot. Returns whether a row was removed.
    pub async fn remove_uncounted(&self, attendee_id: &str) -> AppResult<bool> {
        let result = EventAttendee::delete_many()
            .filter(event_attendee::Column::Id.eq(attendee_id))
            .filter(event_attendee::Column::Rsvp.ne(RsvpStatus::Going))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Release a non-organizer `going` slot.
    ///
    /// The row is deleted when `next` is `None`, otherwise moved to `next`.
    /// With `promote`, the earliest waitlisted attendee is then promoted
    /// (at most one).
    pub async fn release_attendee(
        &self,
        event_id: &str,
        attendee_id: &str,
        next: Option<RsvpStatus>,
        promote: bool,
    ) -> AppResult<SlotRelease> {
        let txn = self.begin().await?;

        let affected = match next {
            None => {
                EventAttendee::delete_many()
                    .filter(event_attendee::Column::Id.eq(attendee_id))
                    .filter(event_attendee::Column::Rsvp.eq(RsvpStatus::Going))
                    .filter(event_attendee::Column::IsOrganizer.eq(false))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .rows_affected
            }
            Some(rsvp) => {
                EventAttendee::update_many()
                    .set(event_attendee::ActiveModel {
                        rsvp: Set(rsvp),
                        updated_at: Set(Some(Utc::now().into())),
                        ..Default::default()
                    })
                    .filter(event_attendee::Column::Id.eq(attendee_id))
                    .filter(event_attendee::Column::Rsvp.eq(RsvpStatus::Going))
                    .filter(event_attendee::Column::IsOrganizer.eq(false))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .rows_affected
            }
        };

        if affected == 0 {
            rollback(txn).await?;
            return Ok(SlotRelease::default());
        }

        release_slot(&txn, event_id).await?;
        sync_status(&txn, event_id).await?;

        let promoted = if promote {
            promote_next(&txn, event_id).await?
        } else {
            None
        };

        commit(txn).await?;
        Ok(SlotRelease {
            released: true,
            promoted,
        })
    }

    /// Mark an event cancelled. Returns whether the status changed.
    pub async fn mark_cancelled(&self, event_id: &str) -> AppResult<bool> {
        let result = Event::update_many()
            .set(event::ActiveModel {
                status: Set(CapacityStatus::Cancelled),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .filter(event::Column::Id.eq(event_id))
            .filter(event::Column::Status.ne(CapacityStatus::Cancelled))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Overwrite the cached counter with a recounted value and re-derive status.
    pub async fn repair_count(&self, event_id: &str, count: u64) -> AppResult<()> {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        let txn = self.begin().await?;

        Event::update_many()
            .col_expr(event::Column::ParticipantCount, Expr::value(count))
            .filter(event::Column::Id.eq(event_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sync_status(&txn, event_id).await?;

        commit(txn).await
    }

    /// Flag an attendee row as checked in.
    pub async fn mark_checked_in(
        &self,
        attendee: event_attendee::Model,
    ) -> AppResult<event_attendee::Model> {
        let now = Utc::now();
        let mut active: event_attendee::ActiveModel = attendee.into();
        active.checked_in = Set(true);
        active.checked_in_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the attendee row of a user.
    pub async fn find_attendee(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<Option<event_attendee::Model>> {
        EventAttendee::find()
            .filter(event_attendee::Column::EventId.eq(event_id))
            .filter(event_attendee::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All attendee rows in join order.
    pub async fn find_attendees(&self, event_id: &str) -> AppResult<Vec<event_attendee::Model>> {
        EventAttendee::find()
            .filter(event_attendee::Column::EventId.eq(event_id))
            .order_by_asc(event_attendee::Column::JoinedAt)
            .order_by_asc(event_attendee::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Waitlisted rows in promotion order.
    pub async fn find_waitlist(&self, event_id: &str) -> AppResult<Vec<event_attendee::Model>> {
        EventAttendee::find()
            .filter(event_attendee::Column::EventId.eq(event_id))
            .filter(event_attendee::Column::Rsvp.eq(RsvpStatus::Waitlist))
            .order_by_asc(event_attendee::Column::JoinedAt)
            .order_by_asc(event_attendee::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count `going` rows.
    pub async fn count_going(&self, event_id: &str) -> AppResult<u64> {
        EventAttendee::find()
            .filter(event_attendee::Column::EventId.eq(event_id))
            .filter(event_attendee::Column::Rsvp.eq(RsvpStatus::Going))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Events that have not ended, with coordinates inside `bounds`, roughly
    /// nearest first, at most `limit` of them.
    pub async fn find_in_bounds(
        &self,
        bounds: GeoBounds,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<event::Model>> {
        let mut query = Event::find()
            .filter(event::Column::Status.ne(CapacityStatus::Cancelled))
            .filter(event::Column::EndsAt.gt(now))
            .filter(event::Column::Latitude.between(bounds.min_lat, bounds.max_lat));

        query = match bounds.lon_range {
            Some((min_lon, max_lon)) => {
                query.filter(event::Column::Longitude.between(min_lon, max_lon))
            }
            None => query.filter(event::Column::Longitude.is_not_null()),
        };

        query
            .order_by_asc(bounds.nearest_first(event::Column::Latitude, event::Column::Longitude))
            .order_by_asc(event::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

async fn rollback(txn: DatabaseTransaction) -> AppResult<()> {
    txn.rollback()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// `participant_count += 1` if the event is live and below capacity.
async fn claim_slot<C: ConnectionTrait>(conn: &C, event_id: &str) -> AppResult<bool> {
    let result = Event::update_many()
        .col_expr(
            event::Column::ParticipantCount,
            Expr::col(event::Column::ParticipantCount).add(1),
        )
        .col_expr(event::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(event::Column::Id.eq(event_id))
        .filter(event::Column::Status.ne(CapacityStatus::Cancelled))
        .filter(
            Condition::any()
                .add(event::Column::Capacity.is_null())
                .add(
                    Expr::col(event::Column::ParticipantCount)
                        .lt(Expr::col(event::Column::Capacity)),
                ),
        )
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(result.rows_affected == 1)
}

async fn release_slot<C: ConnectionTrait>(conn: &C, event_id: &str) -> AppResult<()> {
    Event::update_many()
        .col_expr(
            event::Column::ParticipantCount,
            Expr::col(event::Column::ParticipantCount).sub(1),
        )
        .col_expr(event::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(event::Column::Id.eq(event_id))
        .filter(event::Column::ParticipantCount.gt(0))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

async fn sync_status<C: ConnectionTrait>(conn: &C, event_id: &str) -> AppResult<()> {
    Event::update_many()
        .set(event::ActiveModel {
            status: Set(CapacityStatus::Full),
            ..Default::default()
        })
        .filter(event::Column::Id.eq(event_id))
        .filter(event::Column::Status.eq(CapacityStatus::Open))
        .filter(event::Column::Capacity.is_not_null())
        .filter(Expr::col(event::Column::ParticipantCount).gte(Expr::col(event::Column::Capacity)))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Event::update_many()
        .set(event::ActiveModel {
            status: Set(CapacityStatus::Open),
            ..Default::default()
        })
        .filter(event::Column::Id.eq(event_id))
        .filter(event::Column::Status.eq(CapacityStatus::Full))
        .filter(
            Condition::any()
                .add(event::Column::Capacity.is_null())
                .add(
                    Expr::col(event::Column::ParticipantCount)
                        .lt(Expr::col(event::Column::Capacity)),
                ),
        )
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Move the earliest waitlisted row to `going` if a slot is free.
async fn promote_next<C: ConnectionTrait>(
    conn: &C,
    event_id: &str,
) -> AppResult<Option<event_attendee::Model>> {
    let next = EventAttendee::find()
        .filter(event_attendee::Column::EventId.eq(event_id))
        .filter(event_attendee::Column::Rsvp.eq(RsvpStatus::Waitlist))
        .order_by_asc(event_attendee::Column::JoinedAt)
        .order_by_asc(event_attendee::Column::Id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let Some(next) = next else {
        return Ok(None);
    };

    if !claim_slot(conn, event_id).await? {
        return Ok(None);
    }

    let mut active: event_attendee::ActiveModel = next.into();
    active.rsvp = Set(RsvpStatus::Going);
    active.updated_at = Set(Some(Utc::now().into()));
    let promoted = active
        .update(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    sync_status(conn, event_id).await?;

    Ok(Some(promoted))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_attendee(id: &str, user_id: &str, rsvp: RsvpStatus) -> event_attendee::Model {
        event_attendee::Model {
            id: id.to_string(),
            event_id: "e1".to_string(),
            user_id: user_id.to_string(),
            rsvp,
            is_organizer: false,
            checked_in: false,
            checked_in_at: None,
            joined_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_find_in_bounds_orders_by_distance() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );

        let repo = EventRepository::new(Arc::clone(&db));
        let bounds = GeoBounds {
            center: (13.75, 100.5),
            min_lat: 13.5,
            max_lat: 14.0,
            lon_range: Some((100.2, 100.8)),
        };
        assert!(repo.find_in_bounds(bounds, Utc::now(), 10).await.unwrap().is_empty());
        drop(repo);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        let order_by = &sql[sql.find("ORDER BY").unwrap()..];
        assert!(order_by.contains(r#""latitude" - "#));
        assert!(!order_by.contains("starts_at"));
        assert!(order_by.contains("LIMIT"));
    }

    #[tokio::test]
    async fn test_find_waitlist() {
        let rows = vec![
            create_test_attendee("a1", "user1", RsvpStatus::Waitlist),
            create_test_attendee("a2", "user2", RsvpStatus::Waitlist),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo.find_waitlist("e1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].user_id, "user1");
    }

    #[tokio::test]
    async fn test_release_attendee_without_going_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo
            .release_attendee("e1", "a404", None, true)
            .await
            .unwrap();

        assert_eq!(result, SlotRelease::default());
    }

    #[tokio::test]
    async fn test_admit_attendee_without_slot_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let attendee = event_attendee::ActiveModel {
            id: Set("a1".to_string()),
            event_id: Set("e1".to_string()),
            user_id: Set("user1".to_string()),
            rsvp: Set(RsvpStatus::Going),
            ..Default::default()
        };

        assert!(repo.admit_attendee("e1", attendee).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enqueue_waitlist() {
        let maybe = create_test_attendee("a1", "user1", RsvpStatus::Maybe);
        let queued = event_attendee::Model {
            rsvp: RsvpStatus::Waitlist,
            ..maybe.clone()
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[queued]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo.enqueue_waitlist(maybe).await.unwrap();
        assert_eq!(result.rsvp, RsvpStatus::Waitlist);
    }

    #[tokio::test]
    async fn test_mark_cancelled_is_idempotent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        assert!(repo.mark_cancelled("e1").await.unwrap());
        assert!(!repo.mark_cancelled("e1").await.unwrap());
    }
}
