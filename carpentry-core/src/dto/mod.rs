//! Data Transfer Objects
//!
//! Request payloads sent to the Carpentry API and the small response bodies
//! that have no domain counterpart.

pub mod build;
pub mod builder;
pub mod preferences;
