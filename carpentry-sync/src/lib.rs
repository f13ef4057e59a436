//! Carpentry client synchronization core
//!
//! Keeps a local view of builders, builds and live build output in step with
//! a Carpentry server over plain request/response polling.
//!
//! - [`PollerRegistry`] runs named, interval-driven pollers with a tick budget
//! - [`BuildCache`] holds the latest snapshot per `(builder, build)`
//! - [`OutputSyncEngine`] polls one build's output until it is final
//! - [`ErrorClassifier`] decides whether a failure is ignored, shown or fatal
//! - [`SyncContext`] ties them together per client session
//!
//! # Example
//!
//! ```no_run
//! use carpentry_sync::{SyncConfig, SyncContext, SyncEvent, View};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::from_env()?;
//!     let (context, mut events) = SyncContext::connect(&config)?;
//!
//!     let (builder_id, build_id) = (Uuid::new_v4(), Uuid::new_v4());
//!     context.activate(View::BuildDetail { builder_id, build_id });
//!
//!     while let Some(event) = events.recv().await {
//!         if let SyncEvent::Eof { .. } = event {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod context;
pub mod engine;
pub mod event;
pub mod poller;
mod refresh;

pub use api::CarpentryApi;
pub use cache::{BuildCache, BuilderBucket, CachedBuild, FetchTicket};
pub use classifier::{Classification, ErrorAction, ErrorClassifier};
pub use config::SyncConfig;
pub use context::{Activation, SyncContext, View};
pub use engine::{OutputSyncEngine, SessionEnd, SyncSession, SyncState};
pub use event::{EventSink, SyncEvent};
pub use poller::{PollerHandle, PollerRegistry, StopReason};
pub use refresh::{INDEX_POLLER, builder_poller_name};
