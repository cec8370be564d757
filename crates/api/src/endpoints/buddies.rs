//! Buddy endpoints: requests, connections, blocks and suggestions.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tripmate_common::AppResult;
use tripmate_core::MatchSuggestion;
use tripmate_db::entities::{
    buddy_connection::{self, BuddyStatus},
    user_block,
};

use super::users::UserResponse;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Buddy connection response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub id: String,
    pub user_ids: [String; 2],
    pub requested_by: String,
    pub status: BuddyStatus,
    pub created_at: String,
    pub connected_at: Option<String>,
}

impl From<buddy_connection::Model> for ConnectionResponse {
    fn from(c: buddy_connection::Model) -> Self {
        Self {
            id: c.id,
            user_ids: [c.lo_user_id, c.hi_user_id],
            requested_by: c.requested_by,
            status: c.status,
            created_at: c.created_at.to_rfc3339(),
            connected_at: c.connected_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Block response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub id: String,
    pub blocked_id: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl From<user_block::Model> for BlockResponse {
    fn from(b: user_block::Model) -> Self {
        Self {
            id: b.id,
            blocked_id: b.blocked_id,
            reason: b.reason,
            created_at: b.created_at.to_rfc3339(),
        }
    }
}

/// Request targeting another user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTargetRequest {
    pub user_id: String,
}

/// Request targeting a pending buddy request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTargetRequest {
    pub connection_id: String,
}

/// Block request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub user_id: String,
    pub reason: Option<String>,
}

/// Suggestions request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRequest {
    pub limit: Option<usize>,
}

/// Send a buddy request.
async fn request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserTargetRequest>,
) -> AppResult<ApiResponse<ConnectionResponse>> {
    let connection = state
        .buddy_service
        .send_request(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(connection.into()))
}

/// Accept a buddy request.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConnectionTargetRequest>,
) -> AppResult<ApiResponse<ConnectionResponse>> {
    let connection = state
        .buddy_service
        .accept_request(&user.id, &req.connection_id)
        .await?;
    Ok(ApiResponse::ok(connection.into()))
}

/// Reject a buddy request.
async fn reject(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConnectionTargetRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .buddy_service
        .reject_request(&user.id, &req.connection_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Remove a buddy.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserTargetRequest>,
) -> AppResult<ApiResponse<()>> {
    state.buddy_service.remove_buddy(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// List the caller's buddies.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let buddies = state.buddy_service.list_buddies(&user.id).await?;
    Ok(ApiResponse::ok(buddies.into_iter().map(Into::into).collect()))
}

/// Pending requests sent to the caller.
async fn incoming(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConnectionResponse>>> {
    let requests = state.buddy_service.list_incoming_requests(&user.id).await?;
    Ok(ApiResponse::ok(requests.into_iter().map(Into::into).collect()))
}

/// Pending requests sent by the caller.
async fn outgoing(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConnectionResponse>>> {
    let requests = state.buddy_service.list_outgoing_requests(&user.id).await?;
    Ok(ApiResponse::ok(requests.into_iter().map(Into::into).collect()))
}

/// Block a user.
async fn block(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<ApiResponse<BlockResponse>> {
    let block = state
        .buddy_service
        .block_user(&user.id, &req.user_id, req.reason)
        .await?;
    Ok(ApiResponse::ok(block.into()))
}

/// Unblock a user.
async fn unblock(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserTargetRequest>,
) -> AppResult<ApiResponse<()>> {
    state.buddy_service.unblock_user(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Blocks created by the caller.
async fn blocks(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BlockResponse>>> {
    let blocks = state.buddy_service.list_blocks(&user.id).await?;
    Ok(ApiResponse::ok(blocks.into_iter().map(Into::into).collect()))
}

/// Ranked buddy suggestions.
async fn suggestions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SuggestionsRequest>,
) -> AppResult<ApiResponse<Vec<MatchSuggestion>>> {
    let suggestions = state.suggestion_service.suggest(&user.id, req.limit).await?;
    Ok(ApiResponse::ok(suggestions))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(request))
        .route("/accept", post(accept))
        .route("/reject", post(reject))
        .route("/remove", post(remove))
        .route("/list", post(list))
        .route("/requests/incoming", post(incoming))
        .route("/requests/outgoing", post(outgoing))
        .route("/block", post(block))
        .route("/unblock", post(unblock))
        .route("/blocks", post(blocks))
        .route("/suggestions", post(suggestions))
}
