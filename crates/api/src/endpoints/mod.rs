//! API endpoints.

mod activities;
mod buddies;
mod events;
mod profile;
mod trips;
mod users;

use axum::{Router, middleware};

use crate::middleware::{AppState, auth_middleware};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/profile", profile::router())
        .nest("/trips", trips::router())
        .nest("/buddies", buddies::router())
        .nest("/activities", activities::router())
        .nest("/events", events::router())
}

/// The API mounted under `/api` with token authentication applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
