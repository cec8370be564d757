//! Trip repository.

use std::sync::Arc;

use crate::entities::{Trip, trip};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use tripmate_common::{AppError, AppResult};

/// Trip repository for database operations.
#[derive(Clone)]
pub struct TripRepository {
    db: Arc<DatabaseConnection>,
}

impl TripRepository {
    /// Create a new trip repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a trip by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<trip::Model>> {
        Trip::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new trip.
    pub async fn create(&self, model: trip::ActiveModel) -> AppResult<trip::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a trip by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Trip::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Trip: {id}")));
        }
        Ok(())
    }

    /// Trips of a user that have not ended before `today`, soonest first.
    pub async fn find_upcoming_by_user(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> AppResult<Vec<trip::Model>> {
        Trip::find()
            .filter(trip::Column::UserId.eq(user_id))
            .filter(trip::Column::EndDate.gte(today))
            .order_by_asc(trip::Column::StartDate)
            .order_by_asc(trip::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Other users' trips to `destination_code` whose date range intersects
    /// `[start, end]` (bounds inclusive).
    pub async fn find_intersecting(
        &self,
        destination_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_user_id: &str,
    ) -> AppResult<Vec<trip::Model>> {
        Trip::find()
            .filter(trip::Column::DestinationCode.eq(destination_code))
            .filter(trip::Column::StartDate.lte(end))
            .filter(trip::Column::EndDate.gte(start))
            .filter(trip::Column::UserId.ne(exclude_user_id))
            .order_by_asc(trip::Column::StartDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_trip(id: &str, user_id: &str, code: &str) -> trip::Model {
        trip::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            destination_code: code.to_string(),
            start_date: date(2030, 5, 1),
            end_date: date(2030, 5, 10),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_intersecting() {
        let trips = vec![
            create_test_trip("t2", "user2", "LIS"),
            create_test_trip("t3", "user3", "LIS"),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([trips])
                .into_connection(),
        );

        let repo = TripRepository::new(db);
        let result = repo
            .find_intersecting("LIS", date(2030, 5, 5), date(2030, 5, 12), "user1")
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|t| t.user_id != "user1"));
    }

    #[tokio::test]
    async fn test_delete_missing_trip_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = TripRepository::new(db);
        let result = repo.delete("nope").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
