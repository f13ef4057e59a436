//! Core domain types
//!
//! These types mirror the entities the Carpentry server exposes. They are
//! decoded from API responses and stored as-is in the client-side cache.

pub mod build;
pub mod builder;
pub mod preset;
pub mod user;
