//! HTTP API layer for tripmate.
//!
//! This crate exposes the community services over JSON:
//!
//! - **Endpoints**: users, profiles, trips, buddies, activities, events
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: application state and token resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
