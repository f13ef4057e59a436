//! Carpentry Core
//!
//! Core types shared by the Carpentry client crates.
//!
//! This crate contains:
//! - Domain types: Builders, builds, identities and script presets
//! - DTOs: Request and response bodies exchanged with the Carpentry API,
//!   including server-wide preferences

pub mod domain;
pub mod dto;
