//! Trip endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tripmate_common::AppResult;
use tripmate_core::CreateTripInput;
use tripmate_db::entities::trip;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Trip response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub id: String,
    pub user_id: String,
    pub destination_code: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
}

impl From<trip::Model> for TripResponse {
    fn from(t: trip::Model) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            destination_code: t.destination_code,
            start_date: t.start_date.to_string(),
            end_date: t.end_date.to_string(),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// Delete trip request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTripRequest {
    pub trip_id: String,
}

/// Record a planned trip.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTripInput>,
) -> AppResult<ApiResponse<TripResponse>> {
    let trip = state.trip_service.create_trip(&user.id, input).await?;
    Ok(ApiResponse::ok(trip.into()))
}

/// List the caller's upcoming trips.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<TripResponse>>> {
    let trips = state.trip_service.list_upcoming(&user.id).await?;
    Ok(ApiResponse::ok(trips.into_iter().map(Into::into).collect()))
}

/// Delete one of the caller's trips.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteTripRequest>,
) -> AppResult<ApiResponse<()>> {
    state.trip_service.delete_trip(&user.id, &req.trip_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/list", post(list))
        .route("/delete", post(delete))
}
