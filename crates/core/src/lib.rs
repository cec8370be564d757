//! Core business logic for tripmate.
//!
//! Buddy matching, connection management, nearby discovery and the shared
//! capacity/waitlist lifecycle of activities and events. Services take
//! repositories from `tripmate-db` and return entity models or an
//! [`tripmate_common::AppError`].

pub mod services;

pub use services::*;
