//! Activity repository.
//!
//! Participant rows and the cached `participant_count` are only mutated
//! together, inside one transaction, through the methods here.

use std::sync::Arc;

use super::{GeoBounds, invitation::insert_invitations};
use crate::entities::{
    Activity, ActivityParticipant, activity, activity_participant, invitation,
    shared::CapacityStatus,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use tripmate_common::{AppError, AppResult};

/// Activity repository for database operations.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an activity by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<activity::Model>> {
        Activity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an activity by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<activity::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity: {id}")))
    }

    /// Insert an activity together with its organizer's participant row and
    /// any invitations. Nothing is written unless all of them are.
    pub async fn create_with_organizer(
        &self,
        model: activity::ActiveModel,
        organizer: activity_participant::ActiveModel,
        invitations: Vec<invitation::ActiveModel>,
    ) -> AppResult<activity::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        organizer
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_invitations(&txn, invitations).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created)
    }

    /// Claim a slot and insert the participant row.
    ///
    /// Returns `None` without writing anything when the activity is
    /// cancelled or has no free slot.
    pub async fn admit_participant(
        &self,
        activity_id: &str,
        participant: activity_participant::ActiveModel,
    ) -> AppResult<Option<activity_participant::Model>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !claim_slot(&txn, activity_id).await? {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(None);
        }

        let inserted = participant
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sync_status(&txn, activity_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(Some(inserted))
    }

    /// Delete a non-organizer participant row and release its slot.
    ///
    /// Returns whether a row was removed.
    pub async fn remove_participant(&self, activity_id: &str, user_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = ActivityParticipant::delete_many()
            .filter(activity_participant::Column::ActivityId.eq(activity_id))
            .filter(activity_participant::Column::UserId.eq(user_id))
            .filter(activity_participant::Column::IsOrganizer.eq(false))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if deleted.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        release_slot(&txn, activity_id).await?;
        sync_status(&txn, activity_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Mark an activity cancelled. Returns whether the status changed.
    pub async fn mark_cancelled(&self, activity_id: &str) -> AppResult<bool> {
        let result = Activity::update_many()
            .set(activity::ActiveModel {
                status: Set(CapacityStatus::Cancelled),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .filter(activity::Column::Id.eq(activity_id))
            .filter(activity::Column::Status.ne(CapacityStatus::Cancelled))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Overwrite the cached counter with a recounted value and re-derive status.
    pub async fn repair_count(&self, activity_id: &str, count: u64) -> AppResult<()> {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Activity::update_many()
            .col_expr(activity::Column::ParticipantCount, Expr::value(count))
            .filter(activity::Column::Id.eq(activity_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sync_status(&txn, activity_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a participant row.
    pub async fn find_participant(
        &self,
        activity_id: &str,
        user_id: &str,
    ) -> AppResult<Option<activity_participant::Model>> {
        ActivityParticipant::find()
            .filter(activity_participant::Column::ActivityId.eq(activity_id))
            .filter(activity_participant::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Participants in join order.
    pub async fn find_participants(
        &self,
        activity_id: &str,
    ) -> AppResult<Vec<activity_participant::Model>> {
        ActivityParticipant::find()
            .filter(activity_participant::Column::ActivityId.eq(activity_id))
            .order_by_asc(activity_participant::Column::JoinedAt)
            .order_by_asc(activity_participant::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count participant rows (every activity participant is active).
    pub async fn count_participants(&self, activity_id: &str) -> AppResult<u64> {
        ActivityParticipant::find()
            .filter(activity_participant::Column::ActivityId.eq(activity_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Live activities with coordinates inside `bounds`, roughly nearest
    /// first, at most `limit` of them.
    pub async fn find_in_bounds(
        &self,
        bounds: GeoBounds,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<activity::Model>> {
        let mut query = Activity::find()
            .filter(activity::Column::Status.ne(CapacityStatus::Cancelled))
            .filter(activity::Column::ExpiresAt.gt(now))
            .filter(activity::Column::Latitude.between(bounds.min_lat, bounds.max_lat));

        query = match bounds.lon_range {
            Some((min_lon, max_lon)) => {
                query.filter(activity::Column::Longitude.between(min_lon, max_lon))
            }
            None => query.filter(activity::Column::Longitude.is_not_null()),
        };

        query
            .order_by_asc(
                bounds.nearest_first(activity::Column::Latitude, activity::Column::Longitude),
            )
            .order_by_asc(activity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// `participant_count += 1` if the activity is live and below capacity.
async fn claim_slot<C: ConnectionTrait>(conn: &C, activity_id: &str) -> AppResult<bool> {
    let result = Activity::update_many()
        .col_expr(
            activity::Column::ParticipantCount,
            Expr::col(activity::Column::ParticipantCount).add(1),
        )
        .col_expr(
            activity::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(activity::Column::Id.eq(activity_id))
        .filter(activity::Column::Status.ne(CapacityStatus::Cancelled))
        .filter(
            Condition::any()
                .add(activity::Column::Capacity.is_null())
                .add(
                    Expr::col(activity::Column::ParticipantCount)
                        .lt(Expr::col(activity::Column::Capacity)),
                ),
        )
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(result.rows_affected == 1)
}

async fn release_slot<C: ConnectionTrait>(conn: &C, activity_id: &str) -> AppResult<()> {
    Activity::update_many()
        .col_expr(
            activity::Column::ParticipantCount,
            Expr::col(activity::Column::ParticipantCount).sub(1),
        )
        .col_expr(
            activity::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(activity::Column::Id.eq(activity_id))
        .filter(activity::Column::ParticipantCount.gt(0))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Re-derive `open`/`full` from the counter. Cancelled rows are left alone.
async fn sync_status<C: ConnectionTrait>(conn: &C, activity_id: &str) -> AppResult<()> {
    Activity::update_many()
        .set(activity::ActiveModel {
            status: Set(CapacityStatus::Full),
            ..Default::default()
        })
        .filter(activity::Column::Id.eq(activity_id))
        .filter(activity::Column::Status.eq(CapacityStatus::Open))
        .filter(activity::Column::Capacity.is_not_null())
        .filter(
            Expr::col(activity::Column::ParticipantCount)
                .gte(Expr::col(activity::Column::Capacity)),
        )
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Activity::update_many()
        .set(activity::ActiveModel {
            status: Set(CapacityStatus::Open),
            ..Default::default()
        })
        .filter(activity::Column::Id.eq(activity_id))
        .filter(activity::Column::Status.eq(CapacityStatus::Full))
        .filter(
            Condition::any()
                .add(activity::Column::Capacity.is_null())
                .add(
                    Expr::col(activity::Column::ParticipantCount)
                        .lt(Expr::col(activity::Column::Capacity)),
                ),
        )
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::shared::Visibility;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_activity(id: &str, capacity: Option<i32>, count: i32) -> activity::Model {
        activity::Model {
            id: id.to_string(),
            creator_id: "creator".to_string(),
            title: "Sunset walk".to_string(),
            description: None,
            category: Some("outdoors".to_string()),
            latitude: Some(38.7),
            longitude: Some(-9.1),
            location_name: None,
            capacity,
            participant_count: count,
            status: CapacityStatus::Open,
            visibility: Visibility::Public,
            expires_at: (Utc::now() + Duration::hours(3)).into(),
            created_at: Utc::now().into(),
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
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<activity::Model>::new()])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        let result = repo.get_by_id("a404").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admit_participant_without_slot_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        let participant = activity_participant::ActiveModel {
            id: Set("p1".to_string()),
            activity_id: Set("a1".to_string()),
            user_id: Set("user2".to_string()),
            is_organizer: Set(false),
            joined_at: Set(Utc::now().into()),
        };

        let result = repo.admit_participant("a1", participant).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_admit_participant_claims_slot_with_conditional_update() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = ActivityRepository::new(Arc::clone(&db));
        let participant = activity_participant::ActiveModel {
            id: Set("p1".to_string()),
            activity_id: Set("a1".to_string()),
            user_id: Set("user2".to_string()),
            is_organizer: Set(false),
            joined_at: Set(Utc::now().into()),
        };
        assert!(repo.admit_participant("a1", participant).await.unwrap().is_none());
        drop(repo);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let statements: Vec<&str> = log
            .iter()
            .flat_map(|txn| txn.statements())
            .map(|stmt| stmt.sql.as_str())
            .collect();

        // The increment and the capacity check are one statement
        let claim = statements
            .iter()
            .find(|sql| sql.starts_with(r#"UPDATE "activity""#))
            .unwrap();
        assert!(claim.contains(r#""participant_count" = "participant_count" + "#));
        assert!(claim.contains(r#""participant_count" < "capacity""#));
        assert!(claim.contains(r#""capacity" IS NULL"#));
        assert!(!statements.iter().any(|sql| sql.starts_with("INSERT")));
        assert_eq!(statements.last(), Some(&"ROLLBACK"));
    }

    #[tokio::test]
    async fn test_remove_participant_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        assert!(!repo.remove_participant("a1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_in_bounds() {
        let activities = vec![create_test_activity("a1", Some(4), 1)];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([activities])
                .into_connection(),
        );

        let repo = ActivityRepository::new(Arc::clone(&db));
        let bounds = GeoBounds {
            center: (38.5, -9.0),
            min_lat: 38.0,
            max_lat: 39.0,
            lon_range: Some((-10.0, -8.0)),
        };
        let result = repo.find_in_bounds(bounds, Utc::now(), 100).await.unwrap();
        assert_eq!(result.len(), 1);
        drop(repo);

        // The prefetch cap must cut the farthest rows, not the latest expiring
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        let order_by = &sql[sql.find("ORDER BY").unwrap()..];
        assert!(order_by.contains(r#""latitude" - "#));
        assert!(order_by.contains(r#""longitude" - "#));
        assert!(!order_by.contains("expires_at"));
    }
}
