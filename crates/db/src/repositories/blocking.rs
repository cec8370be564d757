//! User block repository.

use std::sync::Arc;

use crate::entities::{UserBlock, user_block};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use tripmate_common::{AppError, AppResult};

/// Blocking repository for database operations.
#[derive(Clone)]
pub struct BlockingRepository {
    db: Arc<DatabaseConnection>,
}

impl BlockingRepository {
    /// Create a new blocking repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a block by blocker and blocked user.
    pub async fn find_by_pair(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> AppResult<Option<user_block::Model>> {
        UserBlock::find()
            .filter(user_block::Column::BlockerId.eq(blocker_id))
            .filter(user_block::Column::BlockedId.eq(blocked_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if either user is blocking the other (one query).
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let count = UserBlock::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(user_block::Column::BlockerId.eq(user_a))
                            .add(user_block::Column::BlockedId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(user_block::Column::BlockerId.eq(user_b))
                            .add(user_block::Column::BlockedId.eq(user_a)),
                    ),
            )
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new block.
    pub async fn create(&self, model: user_block::ActiveModel) -> AppResult<user_block::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a block by pair. Returns whether a row was removed.
    pub async fn delete_by_pair(&self, blocker_id: &str, blocked_id: &str) -> AppResult<bool> {
        let result = UserBlock::delete_many()
            .filter(user_block::Column::BlockerId.eq(blocker_id))
            .filter(user_block::Column::BlockedId.eq(blocked_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Blocks created by a user, newest first.
    pub async fn find_by_blocker(&self, blocker_id: &str) -> AppResult<Vec<user_block::Model>> {
        UserBlock::find()
            .filter(user_block::Column::BlockerId.eq(blocker_id))
            .order_by_desc(user_block::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every user blocked by or blocking `user_id`.
    pub async fn find_blocked_either_direction(&self, user_id: &str) -> AppResult<Vec<String>> {
        let rows = UserBlock::find()
            .filter(
                Condition::any()
                    .add(user_block::Column::BlockerId.eq(user_id))
                    .add(user_block::Column::BlockedId.eq(user_id)),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|b| {
                if b.blocker_id == user_id {
                    b.blocked_id
                } else {
                    b.blocker_id
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_block(id: &str, blocker_id: &str, blocked_id: &str) -> user_block::Model {
        user_block::Model {
            id: id.to_string(),
            blocker_id: blocker_id.to_string(),
            blocked_id: blocked_id.to_string(),
            reason: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let block = create_test_block("b1", "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[block.clone()]])
                .into_connection(),
        );

        let repo = BlockingRepository::new(db);
        let result = repo.find_by_pair("user1", "user2").await.unwrap();

        assert_eq!(result.unwrap().blocked_id, "user2");
    }

    #[tokio::test]
    async fn test_find_blocked_either_direction() {
        let rows = vec![
            create_test_block("b1", "user1", "user2"),
            create_test_block("b2", "user3", "user1"),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = BlockingRepository::new(db);
        let ids = repo.find_blocked_either_direction("user1").await.unwrap();

        assert_eq!(ids, vec!["user2".to_string(), "user3".to_string()]);
    }
}
