//! Buddy connection repository.

use std::sync::Arc;

use crate::entities::{
    BuddyConnection,
    buddy_connection::{self, BuddyStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use tripmate_common::{AppError, AppResult};

/// Order two user ids into the stored `(lo, hi)` pair.
#[must_use]
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Buddy connection repository for database operations.
#[derive(Clone)]
pub struct BuddyRepository {
    db: Arc<DatabaseConnection>,
}

impl BuddyRepository {
    /// Create a new buddy repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn involving(user_id: &str) -> Condition {
        Condition::any()
            .add(buddy_connection::Column::LoUserId.eq(user_id))
            .add(buddy_connection::Column::HiUserId.eq(user_id))
    }

    /// Find a connection by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<buddy_connection::Model>> {
        BuddyConnection::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the connection between two users, in either argument order.
    pub async fn find_by_pair(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<buddy_connection::Model>> {
        let (lo, hi) = canonical_pair(user_a, user_b);
        BuddyConnection::find()
            .filter(buddy_connection::Column::LoUserId.eq(lo))
            .filter(buddy_connection::Column::HiUserId.eq(hi))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new connection.
    pub async fn create(
        &self,
        model: buddy_connection::ActiveModel,
    ) -> AppResult<buddy_connection::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a connection.
    pub async fn update(
        &self,
        model: buddy_connection::ActiveModel,
    ) -> AppResult<buddy_connection::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a connection by ID. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = BuddyConnection::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete whatever connection exists between two users.
    pub async fn delete_by_pair(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let (lo, hi) = canonical_pair(user_a, user_b);
        let result = BuddyConnection::delete_many()
            .filter(buddy_connection::Column::LoUserId.eq(lo))
            .filter(buddy_connection::Column::HiUserId.eq(hi))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Count connected buddies of a user.
    pub async fn count_connected(&self, user_id: &str) -> AppResult<u64> {
        BuddyConnection::find()
            .filter(Self::involving(user_id))
            .filter(buddy_connection::Column::Status.eq(BuddyStatus::Connected))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Connected rows of a user, most recently connected first.
    pub async fn find_connected(&self, user_id: &str) -> AppResult<Vec<buddy_connection::Model>> {
        BuddyConnection::find()
            .filter(Self::involving(user_id))
            .filter(buddy_connection::Column::Status.eq(BuddyStatus::Connected))
            .order_by_desc(buddy_connection::Column::ConnectedAt)
            .order_by_desc(buddy_connection::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of a user's connected buddies.
    pub async fn find_connected_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .find_connected(user_id)
            .await?
            .iter()
            .filter_map(|c| c.other_party(user_id).map(str::to_string))
            .collect())
    }

    /// Pending requests a user has received.
    pub async fn find_incoming_pending(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<buddy_connection::Model>> {
        BuddyConnection::find()
            .filter(Self::involving(user_id))
            .filter(buddy_connection::Column::Status.eq(BuddyStatus::Pending))
            .filter(buddy_connection::Column::RequestedBy.ne(user_id))
            .order_by_desc(buddy_connection::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending requests a user has sent.
    pub async fn find_outgoing_pending(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<buddy_connection::Model>> {
        BuddyConnection::find()
            .filter(buddy_connection::Column::RequestedBy.eq(user_id))
            .filter(buddy_connection::Column::Status.eq(BuddyStatus::Pending))
            .order_by_desc(buddy_connection::Column::Id)
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

    fn create_test_connection(
        id: &str,
        lo: &str,
        hi: &str,
        requested_by: &str,
        status: BuddyStatus,
    ) -> buddy_connection::Model {
        buddy_connection::Model {
            id: id.to_string(),
            lo_user_id: lo.to_string(),
            hi_user_id: hi.to_string(),
            requested_by: requested_by.to_string(),
            status,
            created_at: Utc::now().into(),
            connected_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_canonical_pair_orders_ids() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
    }

    #[tokio::test]
    async fn test_find_by_pair_either_order() {
        let conn = create_test_connection("c1", "alice", "bob", "bob", BuddyStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[conn.clone()], [conn.clone()]])
                .into_connection(),
        );

        let repo = BuddyRepository::new(db);
        let ab = repo.find_by_pair("alice", "bob").await.unwrap().unwrap();
        let ba = repo.find_by_pair("bob", "alice").await.unwrap().unwrap();

        assert_eq!(ab.id, ba.id);
    }

    #[tokio::test]
    async fn test_find_connected_ids() {
        let rows = vec![
            create_test_connection("c1", "alice", "bob", "alice", BuddyStatus::Connected),
            create_test_connection("c2", "aaron", "bob", "bob", BuddyStatus::Connected),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = BuddyRepository::new(db);
        let ids = repo.find_connected_ids("bob").await.unwrap();

        assert_eq!(ids, vec!["alice".to_string(), "aaron".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = BuddyRepository::new(db);
        assert!(!repo.delete("c404").await.unwrap());
    }
}
