//! Poller registry
//!
//! Named, interval-driven tasks with a bounded number of ticks. At most one
//! poller is live per name: starting a poller under a name that is already
//! running stops the old one first.
//!
//! A tick is awaited to completion before the next one may start, and ticks
//! missed while a slow tick was running are skipped, so two requests from
//! the same poller never overlap.

use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn};

/// Why a poller ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop`/`stop_all` was called
    Stopped,
    /// Another poller was started under the same name
    Replaced,
    /// The tick budget ran out
    Exhausted,
    /// The tick callback asked to stop
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollerStatus {
    Active,
    Stopping(StopReason),
    Finished(StopReason),
}

struct PollerShared {
    name: String,
    generation: u64,
    ticks: AtomicU32,
    status: watch::Sender<PollerStatus>,
}

/// Handle to one running (or finished) poller
#[derive(Clone)]
pub struct PollerHandle {
    shared: Arc<PollerShared>,
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("name", &self.shared.name)
            .field("generation", &self.shared.generation)
            .field("ticks", &self.ticks())
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

impl PollerHandle {
    fn new(name: String, generation: u64) -> Self {
        let (status, _) = watch::channel(PollerStatus::Active);
        Self {
            shared: Arc::new(PollerShared {
                name,
                generation,
                ticks: AtomicU32::new(0),
                status,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// False as soon as a stop was requested, even if a tick is still running
    pub fn is_active(&self) -> bool {
        *self.shared.status.borrow() == PollerStatus::Active
    }

    /// Number of times the tick callback has been invoked
    pub fn ticks(&self) -> u32 {
        self.shared.ticks.load(Ordering::SeqCst)
    }

    /// Request the poller to stop; no further tick is invoked
    pub fn stop(&self) -> bool {
        self.request_stop(StopReason::Stopped)
    }

    /// Wait until the poller's task has exited
    pub async fn finished(&self) -> StopReason {
        let mut rx = self.shared.status.subscribe();
        let status = match rx
            .wait_for(|s| matches!(s, PollerStatus::Finished(_)))
            .await
        {
            Ok(status) => *status,
            Err(_) => PollerStatus::Finished(StopReason::Stopped),
        };
        match status {
            PollerStatus::Finished(reason) | PollerStatus::Stopping(reason) => reason,
            PollerStatus::Active => StopReason::Stopped,
        }
    }

    fn request_stop(&self, reason: StopReason) -> bool {
        self.shared.status.send_if_modified(|status| {
            if *status == PollerStatus::Active {
                *status = PollerStatus::Stopping(reason);
                true
            } else {
                false
            }
        })
    }

    fn finish(&self, reason: StopReason) -> StopReason {
        let mut outcome = reason;
        self.shared.status.send_modify(|status| {
            if let PollerStatus::Stopping(requested) = *status {
                outcome = requested;
            }
            *status = PollerStatus::Finished(outcome);
        });
        outcome
    }

    fn same_poller(&self, other: &PollerHandle) -> bool {
        self.shared.generation == other.shared.generation
    }
}

#[derive(Default)]
struct RegistryInner {
    pollers: HashMap<String, PollerHandle>,
    next_generation: u64,
}

/// Registry of named pollers
///
/// Cloning is cheap; all clones manage the same pollers.
#[derive(Clone, Default)]
pub struct PollerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a poller, replacing any poller already running under `name`
    ///
    /// The first tick runs immediately, then every `interval`. `tick` is
    /// invoked at most `max_ticks` times; returning `ControlFlow::Break`
    /// ends the poller early. Must be called from within a tokio runtime.
    pub fn start<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        max_ticks: u32,
        tick: F,
    ) -> PollerHandle
    where
        F: FnMut(PollerHandle) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let name = name.into();
        let handle = {
            let mut inner = self.lock();
            inner.next_generation += 1;
            let handle = PollerHandle::new(name.clone(), inner.next_generation);
            if let Some(previous) = inner.pollers.insert(name.clone(), handle.clone()) {
                if previous.request_stop(StopReason::Replaced) {
                    debug!("Replaced running poller {}", name);
                }
            }
            handle
        };

        debug!(
            "Starting poller {} (interval: {:?}, max ticks: {})",
            name, interval, max_ticks
        );
        tokio::spawn(drive(
            self.clone(),
            handle.clone(),
            interval,
            max_ticks,
            tick,
        ));
        handle
    }

    /// Stop the poller registered under `name`, if any
    pub fn stop(&self, name: &str) -> bool {
        let removed = self.lock().pollers.remove(name);
        removed.is_some_and(|handle| handle.request_stop(StopReason::Stopped))
    }

    /// Stop every registered poller
    ///
    /// # Returns
    /// How many active pollers were stopped
    pub fn stop_all(&self) -> usize {
        let pollers: Vec<PollerHandle> = self.lock().pollers.drain().map(|(_, h)| h).collect();
        let stopped = pollers
            .iter()
            .filter(|handle| handle.request_stop(StopReason::Stopped))
            .count();
        if stopped > 0 {
            debug!("Stopped {} poller(s)", stopped);
        }
        stopped
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.lock().pollers.get(name).is_some_and(PollerHandle::is_active)
    }

    /// Handle of the poller currently registered under `name`
    pub fn get(&self, name: &str) -> Option<PollerHandle> {
        self.lock().pollers.get(name).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.lock().pollers.values().filter(|h| h.is_active()).count()
    }

    fn release(&self, handle: &PollerHandle) {
        let mut inner = self.lock();
        if inner
            .pollers
            .get(handle.name())
            .is_some_and(|current| current.same_poller(handle))
        {
            inner.pollers.remove(handle.name());
        }
    }
}

async fn drive<F, Fut>(
    registry: PollerRegistry,
    handle: PollerHandle,
    period: Duration,
    max_ticks: u32,
    mut tick: F,
) where
    F: FnMut(PollerHandle) -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let mut finish = Finish {
        registry,
        handle: handle.clone(),
        reason: None,
    };
    let mut status = handle.shared.status.subscribe();
    // tokio panics on a zero period
    let mut interval = time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let reason = loop {
        if handle.ticks() >= max_ticks {
            break StopReason::Exhausted;
        }

        tokio::select! {
            biased;
            _ = stop_requested(&mut status) => break StopReason::Stopped,
            _ = interval.tick() => {}
        }

        // a stop that raced with the timer wins
        if !handle.is_active() {
            break StopReason::Stopped;
        }

        handle.shared.ticks.fetch_add(1, Ordering::SeqCst);
        if tick(handle.clone()).await.is_break() {
            break StopReason::Completed;
        }
    };
    finish.reason = Some(reason);
}

/// Marks a poller finished and frees its name once its task exits
///
/// Runs on drop, so a task torn down mid-tick (a panicking tick, or a
/// runtime shutting down) still ends as `Stopped` and never leaves
/// `finished()` waiting.
struct Finish {
    registry: PollerRegistry,
    handle: PollerHandle,
    /// `None` until the loop exits normally
    reason: Option<StopReason>,
}

impl Drop for Finish {
    fn drop(&mut self) {
        let reason = self.reason.unwrap_or_else(|| {
            warn!(
                "Poller {} was torn down during tick {}",
                self.handle.name(),
                self.handle.ticks()
            );
            StopReason::Stopped
        });
        let reason = self.handle.finish(reason);
        self.registry.release(&self.handle);
        debug!(
            "Poller {} finished after {} tick(s): {:?}",
            self.handle.name(),
            self.handle.ticks(),
            reason
        );
    }
}

async fn stop_requested(status: &mut watch::Receiver<PollerStatus>) {
    let _ = status.wait_for(|s| *s != PollerStatus::Active).await;
}
