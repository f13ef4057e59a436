//! Events published to the view layer

use carpentry_client::ClientError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{Classification, ErrorClassifier};
use crate::poller::{PollerHandle, StopReason};

/// Something the view layer may want to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The builder index was refreshed
    BuildersUpdated,
    /// The build list of a builder was refreshed
    BuildsUpdated { builder_id: Uuid },
    /// A build snapshot in the cache changed
    BuildUpdated { builder_id: Uuid, build_id: Uuid },
    /// A build's output reached its end; its poller has stopped
    Eof { builder_id: Uuid, build_id: Uuid },
    /// A poller ran out of ticks before its work was done
    Exhausted { poller: String },
    /// Message for the user
    Notify(String),
    /// The session must move to another view (e.g. after a 401)
    Redirect(String),
}

/// Sending half of the event channel
///
/// Sending never fails from the caller's point of view: if nobody listens
/// any more, events are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event dropped: no listener");
        }
    }
}

/// Classifies failures and surfaces them the same way everywhere
#[derive(Debug, Clone)]
pub(crate) struct Reporter {
    classifier: ErrorClassifier,
    events: EventSink,
}

impl Reporter {
    pub(crate) fn new(classifier: ErrorClassifier, events: EventSink) -> Self {
        Self { classifier, events }
    }

    pub(crate) fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Classify and log a failure without surfacing it
    pub(crate) fn classify(&self, what: &str, err: &ClientError) -> Classification {
        let classification = self.classifier.classify_error(err);
        match &classification {
            Classification::Silent => debug!("{} failed, retrying later: {}", what, err),
            Classification::Notify { .. } => warn!("{} failed: {}", what, err),
            Classification::Redirect { to } => warn!("{} unauthorized, redirecting to {}", what, to),
        }
        classification
    }

    /// Surface a classified failure to the view layer
    pub(crate) fn surface(&self, classification: &Classification) {
        match classification {
            Classification::Silent => {}
            Classification::Notify { message } => self.events.emit(SyncEvent::Notify(message.clone())),
            Classification::Redirect { to } => self.events.emit(SyncEvent::Redirect(to.clone())),
        }
    }

    /// Classify, log and surface in one step
    pub(crate) fn report(&self, what: &str, err: &ClientError) -> Classification {
        let classification = self.classify(what, err);
        self.surface(&classification);
        classification
    }
}

/// Emit `SyncEvent::Exhausted` if the poller ends by running out of ticks
pub(crate) fn watch_exhaustion(poller: PollerHandle, events: EventSink) {
    tokio::spawn(async move {
        if poller.finished().await == StopReason::Exhausted {
            info!("Poller {} ran out of ticks", poller.name());
            events.emit(SyncEvent::Exhausted {
                poller: poller.name().to_string(),
            });
        }
    });
}
