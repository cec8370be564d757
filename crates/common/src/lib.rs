//! Shared plumbing for the tripmate crates.
//!
//! - [`Config`] and [`CommunityConfig`]: layered settings (files, then
//!   `TRIPMATE__*` environment variables)
//! - [`AppError`] / [`AppResult`]: the error type every layer returns, with
//!   its HTTP mapping
//! - [`IdGenerator`]: time-ordered row ids and bearer tokens

pub mod config;
pub mod error;
pub mod id;

pub use config::{CommunityConfig, Config};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
