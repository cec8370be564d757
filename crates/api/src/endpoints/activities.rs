//! Activity endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tripmate_common::AppResult;
use tripmate_core::{CreateActivityInput, Nearby, NearbyQuery};
use tripmate_db::entities::{
    activity, activity_participant,
    shared::{CapacityStatus, Visibility},
};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Activity response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub capacity: Option<i32>,
    pub participant_count: i32,
    pub status: CapacityStatus,
    pub visibility: Visibility,
    pub expires_at: String,
    pub created_at: String,
}

impl From<activity::Model> for ActivityResponse {
    fn from(a: activity::Model) -> Self {
        Self {
            id: a.id,
            creator_id: a.creator_id,
            title: a.title,
            description: a.description,
            category: a.category,
            latitude: a.latitude,
            longitude: a.longitude,
            location_name: a.location_name,
            capacity: a.capacity,
            participant_count: a.participant_count,
            status: a.status,
            visibility: a.visibility,
            expires_at: a.expires_at.to_rfc3339(),
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

/// Activity with its distance from the query origin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyActivityResponse {
    pub activity: ActivityResponse,
    pub distance_km: f64,
}

impl From<Nearby<activity::Model>> for NearbyActivityResponse {
    fn from(n: Nearby<activity::Model>) -> Self {
        Self {
            activity: n.item.into(),
            distance_km: n.distance_km,
        }
    }
}

/// Participant response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub user_id: String,
    pub is_organizer: bool,
    pub joined_at: String,
}

impl From<activity_participant::Model> for ParticipantResponse {
    fn from(p: activity_participant::Model) -> Self {
        Self {
            user_id: p.user_id,
            is_organizer: p.is_organizer,
            joined_at: p.joined_at.to_rfc3339(),
        }
    }
}

/// Request targeting one activity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTargetRequest {
    pub activity_id: String,
}

/// Create an activity.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateActivityInput>,
) -> AppResult<ApiResponse<ActivityResponse>> {
    let activity = state.activity_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(activity.into()))
}

/// Get an activity.
async fn show(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ActivityTargetRequest>,
) -> AppResult<ApiResponse<ActivityResponse>> {
    let activity = state.activity_service.get(&req.activity_id).await?;
    Ok(ApiResponse::ok(activity.into()))
}

/// Join an activity.
async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ActivityTargetRequest>,
) -> AppResult<ApiResponse<ActivityResponse>> {
    let activity = state
        .activity_service
        .join(&user.id, &req.activity_id)
        .await?;
    Ok(ApiResponse::ok(activity.into()))
}

/// Leave an activity.
async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ActivityTargetRequest>,
) -> AppResult<ApiResponse<ActivityResponse>> {
    let activity = state
        .activity_service
        .leave(&user.id, &req.activity_id)
        .await?;
    Ok(ApiResponse::ok(activity.into()))
}

/// Cancel an activity.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ActivityTargetRequest>,
) -> AppResult<ApiResponse<ActivityResponse>> {
    let activity = state
        .activity_service
        .cancel(&user.id, &req.activity_id)
        .await?;
    Ok(ApiResponse::ok(activity.into()))
}

/// List participants.
async fn participants(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ActivityTargetRequest>,
) -> AppResult<ApiResponse<Vec<ParticipantResponse>>> {
    let participants = state
        .activity_service
        .list_participants(&req.activity_id)
        .await?;
    Ok(ApiResponse::ok(
        participants.into_iter().map(Into::into).collect(),
    ))
}

/// Activities near a point.
async fn nearby(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(query): Json<NearbyQuery>,
) -> AppResult<ApiResponse<Vec<NearbyActivityResponse>>> {
    let activities = state.activity_service.list_nearby(&user.id, query).await?;
    Ok(ApiResponse::ok(activities.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/join", post(join))
        .route("/leave", post(leave))
        .route("/cancel", post(cancel))
        .route("/participants", post(participants))
        .route("/nearby", post(nearby))
}
