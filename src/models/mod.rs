//! Core data models for the bucket manager.
//!
//! These entities map to database tables via `sqlx::FromRow` and feed the
//! HTML templates.

pub mod bucket;
pub mod page;
pub mod session;
pub mod user;
