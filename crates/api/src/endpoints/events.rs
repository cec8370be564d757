//! Event endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tripmate_common::AppResult;
use tripmate_core::{CreateEventInput, EventPhase, Nearby, NearbyQuery, RsvpOutcome};
use tripmate_db::entities::{
    event,
    event_attendee::{self, RsvpStatus},
    shared::{CapacityStatus, Visibility},
};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Event response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub venue_name: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub phase: EventPhase,
    pub capacity: Option<i32>,
    pub participant_count: i32,
    pub status: CapacityStatus,
    pub visibility: Visibility,
    pub waitlist_enabled: bool,
    pub created_at: String,
}

impl From<event::Model> for EventResponse {
    fn from(e: event::Model) -> Self {
        let phase = EventPhase::at(&e, Utc::now());
        Self {
            id: e.id,
            organizer_id: e.organizer_id,
            title: e.title,
            description: e.description,
            category: e.category,
            latitude: e.latitude,
            longitude: e.longitude,
            venue_name: e.venue_name,
            starts_at: e.starts_at.to_rfc3339(),
            ends_at: e.ends_at.to_rfc3339(),
            phase,
            capacity: e.capacity,
            participant_count: e.participant_count,
            status: e.status,
            visibility: e.visibility,
            waitlist_enabled: e.waitlist_enabled,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Event with its distance from the query origin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyEventResponse {
    pub event: EventResponse,
    pub distance_km: f64,
}

impl From<Nearby<event::Model>> for NearbyEventResponse {
    fn from(n: Nearby<event::Model>) -> Self {
        Self {
            event: n.item.into(),
            distance_km: n.distance_km,
        }
    }
}

/// Attendee response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeResponse {
    pub user_id: String,
    pub rsvp: RsvpStatus,
    pub is_organizer: bool,
    pub checked_in: bool,
    pub checked_in_at: Option<String>,
    pub joined_at: String,
}

impl From<event_attendee::Model> for AttendeeResponse {
    fn from(a: event_attendee::Model) -> Self {
        Self {
            user_id: a.user_id,
            rsvp: a.rsvp,
            is_organizer: a.is_organizer,
            checked_in: a.checked_in,
            checked_in_at: a.checked_in_at.map(|t| t.to_rfc3339()),
            joined_at: a.joined_at.to_rfc3339(),
        }
    }
}

/// RSVP response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpResponse {
    pub event: EventResponse,
    pub attendee: AttendeeResponse,
}

impl From<RsvpOutcome> for RsvpResponse {
    fn from(o: RsvpOutcome) -> Self {
        Self {
            event: o.event.into(),
            attendee: o.attendee.into(),
        }
    }
}

/// Request targeting one event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetRequest {
    pub event_id: String,
}

/// RSVP request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpRequest {
    pub event_id: String,
    pub status: RsvpStatus,
}

/// Check-in request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub event_id: String,
    pub user_id: String,
}

/// Create an event.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateEventInput>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Get an event.
async fn show(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.get(&req.event_id).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Join an event (RSVP `going`).
async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<RsvpResponse>> {
    let outcome = state.event_service.join(&user.id, &req.event_id).await?;
    Ok(ApiResponse::ok(outcome.into()))
}

/// Set the caller's RSVP.
async fn rsvp(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RsvpRequest>,
) -> AppResult<ApiResponse<RsvpResponse>> {
    let outcome = state
        .event_service
        .rsvp(&user.id, &req.event_id, req.status)
        .await?;
    Ok(ApiResponse::ok(outcome.into()))
}

/// Leave an event.
async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.leave(&user.id, &req.event_id).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Cancel an event.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.cancel(&user.id, &req.event_id).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Check an attendee in.
async fn check_in(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CheckInRequest>,
) -> AppResult<ApiResponse<AttendeeResponse>> {
    let attendee = state
        .event_service
        .check_in(&user.id, &req.event_id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(attendee.into()))
}

/// List all attendees.
async fn attendees(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<Vec<AttendeeResponse>>> {
    let attendees = state.event_service.list_attendees(&req.event_id).await?;
    Ok(ApiResponse::ok(attendees.into_iter().map(Into::into).collect()))
}

/// List the waitlist in promotion order.
async fn waitlist(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventTargetRequest>,
) -> AppResult<ApiResponse<Vec<AttendeeResponse>>> {
    let waitlist = state.event_service.list_waitlist(&req.event_id).await?;
    Ok(ApiResponse::ok(waitlist.into_iter().map(Into::into).collect()))
}

/// Events near a point.
async fn nearby(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(query): Json<NearbyQuery>,
) -> AppResult<ApiResponse<Vec<NearbyEventResponse>>> {
    let events = state.event_service.list_nearby(&user.id, query).await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/join", post(join))
        .route("/rsvp", post(rsvp))
        .route("/leave", post(leave))
        .route("/cancel", post(cancel))
        .route("/check-in", post(check_in))
        .route("/attendees", post(attendees))
        .route("/waitlist", post(waitlist))
        .route("/nearby", post(nearby))
}
