//! Sync context
//!
//! Owns the poller registry, the build cache and the event channel for one
//! client session. Views are activated through it, and every mutating call
//! goes through it so the cache and the error surface stay consistent.

use carpentry_client::{CarpentryClient, ClientError};
use carpentry_core::domain::build::Build;
use carpentry_core::domain::builder::Builder;
use carpentry_core::domain::user::User;
use carpentry_core::dto::build::TriggerBuild;
use carpentry_core::dto::builder::{CreateBuilder, EditBuilder};
use carpentry_core::dto::preferences::Preferences;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::CarpentryApi;
use crate::cache::BuildCache;
use crate::classifier::{Classification, ErrorClassifier};
use crate::config::SyncConfig;
use crate::engine::{OutputSyncEngine, SyncSession};
use crate::event::{EventSink, Reporter, SyncEvent, watch_exhaustion};
use crate::poller::{PollerHandle, PollerRegistry};
use crate::refresh::{INDEX_POLLER, Refresher, builder_poller_name};

/// A screen of the client, as far as polling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Fullscreen,
    BuilderDetail { builder_id: Uuid },
    BuildDetail { builder_id: Uuid, build_id: Uuid },
    /// Forms, preferences, splash: nothing polls
    Other,
}

/// What a view activation started
#[derive(Debug)]
pub enum Activation {
    Idle,
    Polling(PollerHandle),
    Build(SyncSession),
}

impl Activation {
    /// Handle of the poller the view runs, if any
    pub fn poller(&self) -> Option<&PollerHandle> {
        match self {
            Activation::Idle => None,
            Activation::Polling(poller) => Some(poller),
            Activation::Build(session) => Some(session.poller()),
        }
    }

    pub fn into_session(self) -> Option<SyncSession> {
        match self {
            Activation::Build(session) => Some(session),
            Activation::Idle | Activation::Polling(_) => None,
        }
    }
}

pub struct SyncContext {
    api: Arc<dyn CarpentryApi>,
    registry: PollerRegistry,
    cache: BuildCache,
    reporter: Reporter,
    engine: OutputSyncEngine,
    builder_poll_interval: Duration,
    index_poll_interval: Duration,
    max_ticks: u32,
}

impl SyncContext {
    /// Build a context around any backend
    ///
    /// # Returns
    /// The context and the receiving end of its event channel
    pub fn new(
        config: &SyncConfig,
        api: Arc<dyn CarpentryApi>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = EventSink::channel();
        let reporter = Reporter::new(ErrorClassifier::new(config.login_route.clone()), events);
        let cache = BuildCache::new();
        let engine = OutputSyncEngine::with_reporter(
            Arc::clone(&api),
            cache.clone(),
            reporter.clone(),
            config.build_poll_interval,
            config.max_ticks,
        );

        let context = Self {
            api,
            registry: PollerRegistry::new(),
            cache,
            reporter,
            engine,
            builder_poll_interval: config.builder_poll_interval,
            index_poll_interval: config.index_poll_interval,
            max_ticks: config.max_ticks,
        };
        (context, rx)
    }

    /// Build a context backed by the HTTP client
    pub fn connect(
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncEvent>), ClientError> {
        let client = match &config.token {
            Some(token) => CarpentryClient::with_token(config.base_url.clone(), token)?,
            None => CarpentryClient::new(config.base_url.clone()),
        };
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn registry(&self) -> &PollerRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        self.reporter.classifier()
    }

    /// Switch to `view`
    ///
    /// Every running poller is stopped first, so at most the pollers of the
    /// new view remain.
    pub fn activate(&self, view: View) -> Activation {
        let stopped = self.registry.stop_all();
        debug!("Activating {:?} (stopped {} poller(s))", view, stopped);

        match view {
            View::Dashboard | View::Fullscreen => {
                let refresher = self.refresher();
                let poller = self.registry.start(
                    INDEX_POLLER,
                    self.index_poll_interval,
                    self.max_ticks,
                    move |poller| {
                        let refresher = refresher.clone();
                        async move { refresher.refresh_builders(&poller).await }
                    },
                );
                watch_exhaustion(poller.clone(), self.reporter.events().clone());
                Activation::Polling(poller)
            }
            View::BuilderDetail { builder_id } => {
                let refresher = self.refresher();
                let poller = self.registry.start(
                    builder_poller_name(builder_id),
                    self.builder_poll_interval,
                    self.max_ticks,
                    move |poller| {
                        let refresher = refresher.clone();
                        async move { refresher.refresh_builds(&poller, builder_id).await }
                    },
                );
                watch_exhaustion(poller.clone(), self.reporter.events().clone());
                Activation::Polling(poller)
            }
            View::BuildDetail {
                builder_id,
                build_id,
            } => Activation::Build(self.engine.start(&self.registry, builder_id, build_id)),
            View::Other => Activation::Idle,
        }
    }

    /// Leave the current view without entering another
    pub fn deactivate(&self) -> usize {
        self.registry.stop_all()
    }

    fn refresher(&self) -> Refresher {
        Refresher::new(Arc::clone(&self.api), self.cache.clone(), self.reporter.clone())
    }

    /// Classify a failed call once and surface it
    ///
    /// A redirect leaves the current view, so every poller is stopped.
    fn failed(&self, what: &str, err: ClientError) -> ClientError {
        if let Classification::Redirect { .. } = self.reporter.report(what, &err) {
            self.registry.stop_all();
        }
        err
    }

    /// One-off listing of builders; refreshes the builder index
    pub async fn list_builders(&self) -> Result<Vec<Builder>, ClientError> {
        let ticket = self.cache.issue_ticket();
        let builders = self
            .api
            .list_builders()
            .await
            .map_err(|err| self.failed("Listing builders", err))?;
        self.cache.replace_builders_from(ticket, builders.clone());
        Ok(builders)
    }

    /// One-off listing of a builder's builds; refreshes its bucket
    pub async fn list_builds(&self, builder_id: Uuid) -> Result<Vec<Build>, ClientError> {
        let ticket = self.cache.issue_ticket();
        let builds = self
            .api
            .list_builds(builder_id)
            .await
            .map_err(|err| self.failed("Listing builds", err))?;
        self.cache
            .replace_builder_builds_from(ticket, builder_id, builds.clone());
        Ok(builds)
    }

    pub async fn get_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        let builder = self
            .api
            .get_builder(builder_id)
            .await
            .map_err(|err| self.failed("Fetching builder", err))?;
        self.cache.upsert_builder(builder.clone());
        Ok(builder)
    }

    pub async fn create_builder(&self, req: &CreateBuilder) -> Result<Builder, ClientError> {
        let builder = self
            .api
            .create_builder(req)
            .await
            .map_err(|err| self.failed("Creating builder", err))?;
        info!("Created builder {} ({})", builder.name, builder.id);
        self.cache.upsert_builder(builder.clone());
        Ok(builder)
    }

    pub async fn edit_builder(
        &self,
        builder_id: Uuid,
        req: &EditBuilder,
    ) -> Result<Builder, ClientError> {
        let builder = self
            .api
            .edit_builder(builder_id, req)
            .await
            .map_err(|err| self.failed("Editing builder", err))?;
        self.cache.upsert_builder(builder.clone());
        Ok(builder)
    }

    /// Delete a builder and forget it and its builds locally
    pub async fn delete_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        let builder = self
            .api
            .delete_builder(builder_id)
            .await
            .map_err(|err| self.failed("Deleting builder", err))?;
        info!("Deleted builder {}", builder_id);
        self.cache.remove_builder(builder_id);
        Ok(builder)
    }

    /// Trigger a build; the new build is written to the cache
    pub async fn trigger_build(
        &self,
        builder_id: Uuid,
        req: &TriggerBuild,
    ) -> Result<Build, ClientError> {
        let ticket = self.cache.issue_ticket();
        let build = self
            .api
            .trigger_build(builder_id, req)
            .await
            .map_err(|err| self.failed("Triggering build", err))?;
        info!("Triggered build {} of builder {}", build.id, builder_id);
        self.cache.apply_build(ticket, build.clone());
        Ok(build)
    }

    /// Delete every build of a builder
    ///
    /// # Returns
    /// How many builds the server removed
    pub async fn clear_builds(&self, builder_id: Uuid) -> Result<usize, ClientError> {
        let cleared = self
            .api
            .clear_builds(builder_id)
            .await
            .map_err(|err| self.failed("Clearing builds", err))?;
        info!("Cleared {} build(s) of builder {}", cleared.total, builder_id);
        self.cache.clear(builder_id);
        Ok(cleared.total)
    }

    pub async fn get_build(&self, build_id: Uuid) -> Result<Build, ClientError> {
        let ticket = self.cache.issue_ticket();
        let build = self
            .api
            .get_build(build_id)
            .await
            .map_err(|err| self.failed("Fetching build", err))?;
        self.cache.apply_build(ticket, build.clone());
        Ok(build)
    }

    /// Delete a build, stop following its output and forget it locally
    pub async fn delete_build(&self, builder_id: Uuid, build_id: Uuid) -> Result<(), ClientError> {
        self.api
            .delete_build(build_id)
            .await
            .map_err(|err| self.failed("Deleting build", err))?;
        info!("Deleted build {}", build_id);
        self.registry.stop(&OutputSyncEngine::poller_name(build_id));
        self.cache.remove_build(builder_id, build_id);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.api
            .current_user()
            .await
            .map_err(|err| self.failed("Resolving user", err))
    }

    /// Store server-wide preferences
    ///
    /// # Returns
    /// The preferences the server stored
    pub async fn set_preferences(&self, req: &Preferences) -> Result<Preferences, ClientError> {
        let stored = self
            .api
            .set_preferences(req)
            .await
            .map_err(|err| self.failed("Saving preferences", err))?;
        info!("Saved preferences");
        Ok(stored)
    }
}
