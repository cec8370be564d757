//! User service.

use sea_orm::Set;
use serde::Deserialize;
use tripmate_common::{AppError, AppResult, IdGenerator};
use tripmate_db::{entities::user, repositories::UserRepository};
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a user and issue an access token (returned in `token`).
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        let username = input.username.trim();
        if username.is_empty()
            || !username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        if self.user_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            token: Set(Some(self.id_gen.generate_token())),
            buddies_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Regenerate a user's authentication token.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tripmate_db::test_utils::TestDatabase;

    async fn service() -> UserService {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        UserService::new(UserRepository::new(db))
    }

    fn input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = service().await;

        let user = service.register(input("alice")).await.unwrap();
        let token = user.token.clone().unwrap();

        let found = service.authenticate_by_token(&token).await.unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.buddies_count, 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let service = service().await;

        service.register(input("alice")).await.unwrap();
        let result = service.register(input("alice")).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_username() {
        let service = service().await;

        assert!(matches!(
            service.register(input("")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.register(input("al ice")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let service = service().await;
        assert!(matches!(
            service.authenticate_by_token("nope").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_regenerate_token_invalidates_old_one() {
        let service = service().await;
        let user = service.register(input("alice")).await.unwrap();
        let old = user.token.unwrap();

        let new = service.regenerate_token(&user.id).await.unwrap();

        assert_ne!(old, new);
        assert!(service.authenticate_by_token(&old).await.is_err());
        assert_eq!(service.authenticate_by_token(&new).await.unwrap().id, user.id);
    }
}
