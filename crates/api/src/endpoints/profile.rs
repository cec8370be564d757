//! Profile endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use tripmate_common::AppResult;
use tripmate_core::{ProfileView, UpdateProfileInput};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Show profile request. Defaults to the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowProfileRequest {
    pub user_id: Option<String>,
}

/// Replace the caller's profile.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<ProfileView>> {
    let profile = state.profile_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(profile))
}

/// Get a profile.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowProfileRequest>,
) -> AppResult<ApiResponse<ProfileView>> {
    let user_id = req.user_id.unwrap_or(user.id);
    let profile = state.profile_service.get_profile(&user_id).await?;
    Ok(ApiResponse::ok(profile))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(update))
        .route("/show", post(show))
}
