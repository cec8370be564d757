//! User profile repository (profile row plus its tag rows).

use std::sync::Arc;

use crate::entities::{
    UserProfile, UserTag, user_profile,
    user_tag::{self, TagKind},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, sea_query::Expr,
};
use tripmate_common::{AppError, AppResult};

/// User profile repository for database operations.
#[derive(Clone)]
pub struct UserProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl UserProfileRepository {
    /// Create a new user profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user profile by user ID.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find profiles for many users.
    pub async fn find_by_user_ids(
        &self,
        user_ids: &[String],
    ) -> AppResult<Vec<user_profile::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        UserProfile::find()
            .filter(user_profile::Column::UserId.is_in(user_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user profile.
    pub async fn create(&self, model: user_profile::ActiveModel) -> AppResult<user_profile::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags of one user, ordered by kind then tag.
    pub async fn find_tags(&self, user_id: &str) -> AppResult<Vec<user_tag::Model>> {
        UserTag::find()
            .filter(user_tag::Column::UserId.eq(user_id))
            .order_by_asc(user_tag::Column::Kind)
            .order_by_asc(user_tag::Column::Tag)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags of many users (for batch scoring).
    pub async fn find_tags_for_users(
        &self,
        user_ids: &[String],
    ) -> AppResult<Vec<user_tag::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        UserTag::find()
            .filter(user_tag::Column::UserId.is_in(user_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace a profile row and all of its tag rows in one transaction.
    pub async fn replace(
        &self,
        user_id: &str,
        profile: user_profile::ActiveModel,
        tags: Vec<user_tag::ActiveModel>,
    ) -> AppResult<user_profile::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let exists = UserProfile::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some();

        let saved = if exists {
            profile.update(&txn).await
        } else {
            profile.insert(&txn).await
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        UserTag::delete_many()
            .filter(user_tag::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !tags.is_empty() {
            UserTag::insert_many(tags)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(saved)
    }

    /// Users sharing the most interest tags with `tags`, best first.
    ///
    /// Users in `exclude` are skipped. Ties are broken by user id so the
    /// sample is stable.
    pub async fn find_users_by_shared_interests(
        &self,
        tags: &[String],
        exclude: &[String],
        limit: u64,
    ) -> AppResult<Vec<String>> {
        if tags.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let mut query = UserTag::find()
            .select_only()
            .column(user_tag::Column::UserId)
            .filter(user_tag::Column::Kind.eq(TagKind::Interest))
            .filter(user_tag::Column::Tag.is_in(tags.to_vec()));

        if !exclude.is_empty() {
            query = query.filter(user_tag::Column::UserId.is_not_in(exclude.to_vec()));
        }

        query
            .group_by(user_tag::Column::UserId)
            .order_by_desc(Expr::col(user_tag::Column::Id).count())
            .order_by_asc(user_tag::Column::UserId)
            .limit(limit)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
