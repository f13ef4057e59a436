//! Output sync engine
//!
//! Keeps the cached snapshot of one build up to date by polling its output
//! until the stream ends, the tick budget runs out, or the session is no
//! longer authenticated.
//!
//! The transport never says "stream closed", so end of output is inferred:
//! two consecutive successful fetches return the same `stdout` *and* the
//! server reports `done`. Neither signal is trusted on its own.

use carpentry_client::ClientError;
use carpentry_core::domain::build::Build;
use carpentry_core::dto::build::BuildOutput;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::CarpentryApi;
use crate::cache::{BuildCache, FetchTicket};
use crate::classifier::{Classification, ErrorClassifier};
use crate::event::{EventSink, Reporter, SyncEvent, watch_exhaustion};
use crate::poller::{PollerHandle, PollerRegistry, StopReason};

/// State of one build view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No successful fetch yet in this session
    Loading,
    /// Output may still grow
    Streaming,
    /// Output is final; polling stopped
    Eof,
    /// The session was redirected away; polling stopped
    Error,
}

/// How a sync session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Eof,
    Redirected,
    /// Tick budget ran out; the last snapshot stays in the cache
    Exhausted,
    /// Stopped by navigation or replaced by a newer session
    Cancelled,
}

/// Starts output sync sessions
pub struct OutputSyncEngine {
    api: Arc<dyn CarpentryApi>,
    cache: BuildCache,
    reporter: Reporter,
    interval: Duration,
    max_ticks: u32,
}

impl OutputSyncEngine {
    pub fn new(
        api: Arc<dyn CarpentryApi>,
        cache: BuildCache,
        classifier: ErrorClassifier,
        events: EventSink,
        interval: Duration,
        max_ticks: u32,
    ) -> Self {
        Self::with_reporter(api, cache, Reporter::new(classifier, events), interval, max_ticks)
    }

    pub(crate) fn with_reporter(
        api: Arc<dyn CarpentryApi>,
        cache: BuildCache,
        reporter: Reporter,
        interval: Duration,
        max_ticks: u32,
    ) -> Self {
        Self {
            api,
            cache,
            reporter,
            interval,
            max_ticks,
        }
    }

    /// Name of the poller that syncs `build_id`
    pub fn poller_name(build_id: Uuid) -> String {
        format!("build:{}", build_id)
    }

    /// Start syncing a build, replacing any session already syncing it
    ///
    /// A snapshot already in the cache counts as the previous fetch. That
    /// includes a snapshot written by a builds listing, so the listing and the
    /// first output fetch are the two consecutive fetches EOF needs: a
    /// finished build reopened from the cache goes from `Loading` straight to
    /// `Eof` on its first tick without ever being `Streaming`.
    pub fn start(&self, registry: &PollerRegistry, builder_id: Uuid, build_id: Uuid) -> SyncSession {
        let previous = self
            .cache
            .snapshot(builder_id, build_id)
            .map(|build| build.stdout);
        let (state, state_rx) = watch::channel(SyncState::Loading);

        let session = Arc::new(Session {
            api: Arc::clone(&self.api),
            cache: self.cache.clone(),
            reporter: self.reporter.clone(),
            builder_id,
            build_id,
            state,
            progress: Mutex::new(Progress {
                previous,
                last_notice: None,
            }),
        });

        info!("Syncing output of build {} (builder {})", build_id, builder_id);
        let poller = registry.start(
            Self::poller_name(build_id),
            self.interval,
            self.max_ticks,
            move |poller| {
                let session = Arc::clone(&session);
                async move { session.tick(&poller).await }
            },
        );
        watch_exhaustion(poller.clone(), self.reporter.events().clone());

        SyncSession {
            builder_id,
            build_id,
            poller,
            state: state_rx,
            cache: self.cache.clone(),
        }
    }
}

struct Progress {
    /// `stdout` of the last successful fetch
    previous: Option<String>,
    /// Last notification surfaced, to avoid repeating it every tick
    last_notice: Option<String>,
}

struct Session {
    api: Arc<dyn CarpentryApi>,
    cache: BuildCache,
    reporter: Reporter,
    builder_id: Uuid,
    build_id: Uuid,
    state: watch::Sender<SyncState>,
    progress: Mutex<Progress>,
}

impl Session {
    async fn tick(&self, poller: &PollerHandle) -> ControlFlow<()> {
        let ticket = self.cache.issue_ticket();
        let result = self.api.fetch_output(self.build_id).await;

        if !poller.is_active() {
            debug!(
                "Discarding output of build {}: poller {} was stopped",
                self.build_id,
                poller.name()
            );
            return ControlFlow::Continue(());
        }

        match result {
            Ok(output) => self.apply(ticket, output),
            Err(err) => self.fail(&err),
        }
    }

    fn apply(&self, ticket: FetchTicket, output: BuildOutput) -> ControlFlow<()> {
        let unchanged = {
            let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
            progress.last_notice = None;
            let unchanged = progress.previous.as_deref() == Some(output.stdout.as_str());
            progress.previous = Some(output.stdout.clone());
            unchanged
        };

        let cached = self.cache.snapshot(self.builder_id, self.build_id);
        let build = match cached.clone() {
            Some(mut build) => {
                build.apply_output(&output);
                build
            }
            None => Build::from_output(self.builder_id, self.build_id, &output),
        };

        let status = build.status;
        if cached.as_ref() != Some(&build) && self.cache.apply_build(ticket, build) {
            self.reporter.events().emit(SyncEvent::BuildUpdated {
                builder_id: self.builder_id,
                build_id: self.build_id,
            });
        }

        if unchanged && output.done {
            info!("Output of build {} is complete ({})", self.build_id, status);
            self.state.send_replace(SyncState::Eof);
            self.reporter.events().emit(SyncEvent::Eof {
                builder_id: self.builder_id,
                build_id: self.build_id,
            });
            return ControlFlow::Break(());
        }

        self.state.send_replace(SyncState::Streaming);
        ControlFlow::Continue(())
    }

    fn fail(&self, err: &ClientError) -> ControlFlow<()> {
        let what = format!("Fetching output of build {}", self.build_id);
        let classification = self.reporter.classify(&what, err);

        match &classification {
            Classification::Silent => ControlFlow::Continue(()),
            Classification::Notify { message } => {
                let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
                if progress.last_notice.as_deref() != Some(message.as_str()) {
                    progress.last_notice = Some(message.clone());
                    self.reporter.surface(&classification);
                }
                ControlFlow::Continue(())
            }
            Classification::Redirect { .. } => {
                self.state.send_replace(SyncState::Error);
                self.reporter.surface(&classification);
                ControlFlow::Break(())
            }
        }
    }
}

/// A running (or finished) build view session
pub struct SyncSession {
    builder_id: Uuid,
    build_id: Uuid,
    poller: PollerHandle,
    state: watch::Receiver<SyncState>,
    cache: BuildCache,
}

impl SyncSession {
    pub fn builder_id(&self) -> Uuid {
        self.builder_id
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn poller(&self) -> &PollerHandle {
        &self.poller
    }

    /// Latest snapshot in the cache, including one from an earlier session
    pub fn snapshot(&self) -> Option<Build> {
        self.cache.snapshot(self.builder_id, self.build_id)
    }

    pub fn stop(&self) -> bool {
        self.poller.stop()
    }

    /// Wait for the session to end
    pub async fn finished(&self) -> SessionEnd {
        match self.poller.finished().await {
            StopReason::Exhausted => SessionEnd::Exhausted,
            StopReason::Stopped | StopReason::Replaced => SessionEnd::Cancelled,
            StopReason::Completed => match self.state() {
                SyncState::Eof => SessionEnd::Eof,
                _ => SessionEnd::Redirected,
            },
        }
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("builder_id", &self.builder_id)
            .field("build_id", &self.build_id)
            .field("state", &self.state())
            .field("poller", &self.poller)
            .finish()
    }
}
