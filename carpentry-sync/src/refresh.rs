//! List refreshers
//!
//! Periodic re-listing for the dashboard (all builders) and for an open
//! builder (its builds). Both write whole listings into the cache under the
//! ticket taken when the request started.

use carpentry_client::ClientError;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::api::CarpentryApi;
use crate::cache::BuildCache;
use crate::classifier::Classification;
use crate::event::{Reporter, SyncEvent};
use crate::poller::PollerHandle;

/// Poller name of the dashboard refresher
pub const INDEX_POLLER: &str = "index";

/// Poller name of the refresher for one builder's builds
pub fn builder_poller_name(builder_id: Uuid) -> String {
    format!("builder:{}", builder_id)
}

#[derive(Clone)]
pub(crate) struct Refresher {
    api: Arc<dyn CarpentryApi>,
    cache: BuildCache,
    reporter: Reporter,
    /// Last notification surfaced, so a persistent failure is shown once
    last_notice: Arc<Mutex<Option<String>>>,
}

impl Refresher {
    pub(crate) fn new(api: Arc<dyn CarpentryApi>, cache: BuildCache, reporter: Reporter) -> Self {
        Self {
            api,
            cache,
            reporter,
            last_notice: Arc::new(Mutex::new(None)),
        }
    }

    /// One dashboard tick: re-list builders
    pub(crate) async fn refresh_builders(&self, poller: &PollerHandle) -> ControlFlow<()> {
        let ticket = self.cache.issue_ticket();
        let result = self.api.list_builders().await;

        if !poller.is_active() {
            debug!("Discarding builder listing: poller {} was stopped", poller.name());
            return ControlFlow::Continue(());
        }

        match result {
            Ok(builders) => {
                debug!("Listed {} builder(s)", builders.len());
                self.recovered();
                if self.cache.replace_builders_from(ticket, builders) {
                    self.reporter.events().emit(SyncEvent::BuildersUpdated);
                }
                ControlFlow::Continue(())
            }
            Err(err) => self.fail("Listing builders", &err),
        }
    }

    /// One builder-view tick: re-list the builder's builds
    pub(crate) async fn refresh_builds(
        &self,
        poller: &PollerHandle,
        builder_id: Uuid,
    ) -> ControlFlow<()> {
        let ticket = self.cache.issue_ticket();
        let result = self.api.list_builds(builder_id).await;

        if !poller.is_active() {
            debug!("Discarding build listing: poller {} was stopped", poller.name());
            return ControlFlow::Continue(());
        }

        match result {
            Ok(builds) => {
                debug!("Listed {} build(s) of builder {}", builds.len(), builder_id);
                self.recovered();
                if self.cache.replace_builder_builds_from(ticket, builder_id, builds) {
                    self.reporter
                        .events()
                        .emit(SyncEvent::BuildsUpdated { builder_id });
                }
                ControlFlow::Continue(())
            }
            Err(err) => self.fail(&format!("Listing builds of builder {}", builder_id), &err),
        }
    }

    fn recovered(&self) {
        *self.last_notice.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn fail(&self, what: &str, err: &ClientError) -> ControlFlow<()> {
        let classification = self.reporter.classify(what, err);
        match &classification {
            Classification::Silent => ControlFlow::Continue(()),
            Classification::Notify { message } => {
                let mut last = self.last_notice.lock().unwrap_or_else(PoisonError::into_inner);
                if last.as_deref() != Some(message.as_str()) {
                    *last = Some(message.clone());
                    self.reporter.surface(&classification);
                }
                ControlFlow::Continue(())
            }
            Classification::Redirect { .. } => {
                self.reporter.surface(&classification);
                ControlFlow::Break(())
            }
        }
    }
}
