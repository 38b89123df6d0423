//! Client-side staleness detection.
//!
//! The poller compares a locally held snapshot of the server's global write
//! clock against fresh values on a fixed interval. The first observed value
//! is adopted silently; any later, greater value means another client wrote
//! data, so the poller emits one stale-data event and goes quiet until the
//! user explicitly refreshes. Transient check failures never stop the
//! timer.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::status::StatusSource;

/// Buffer size for the poller event channel.
/// Events are rare (at most one per interval); 8 leaves headroom for a slow
/// consumer.
const EVENT_CHANNEL_SIZE: usize = 8;

/// Snapshot value meaning "no server clock observed yet"
const SNAPSHOT_UNKNOWN: i64 = 0;

/// Signals surfaced to the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerEvent {
    /// Another client wrote data; the local view is outdated. Emitted at
    /// most once per polling run.
    StaleDataDetected,
    /// The status check was rejected as unauthenticated. Forwarded to the
    /// application's session handling rather than swallowed.
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    StaleDetected,
}

enum CheckOutcome {
    Continue,
    Stale,
}

struct PollerInner {
    snapshot: AtomicI64,
    state: Mutex<PollerState>,
}

/// Periodic staleness checker against a [`StatusSource`].
///
/// The timer is a spawned task owned through its `JoinHandle`, so start and
/// stop are structural: stopping aborts the task, starting replaces it, and
/// dropping the poller cancels it.
pub struct StalenessPoller<C: StatusSource> {
    source: Arc<C>,
    interval: Duration,
    events: mpsc::Sender<PollerEvent>,
    inner: Arc<PollerInner>,
    task: Option<JoinHandle<()>>,
}

impl<C: StatusSource> StalenessPoller<C> {
    /// Create a poller and the receiving end of its event channel.
    pub fn new(source: Arc<C>, interval: Duration) -> (Self, mpsc::Receiver<PollerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let poller = Self {
            source,
            interval,
            events: tx,
            inner: Arc::new(PollerInner {
                snapshot: AtomicI64::new(SNAPSHOT_UNKNOWN),
                state: Mutex::new(PollerState::Idle),
            }),
            task: None,
        };
        (poller, rx)
    }

    pub fn state(&self) -> PollerState {
        *self.inner.state.lock()
    }

    /// Last adopted server clock value, [`SNAPSHOT_UNKNOWN`] before the
    /// first successful check.
    pub fn snapshot(&self) -> i64 {
        self.inner.snapshot.load(Ordering::SeqCst)
    }

    /// Begin polling: one immediate check, then one per interval.
    /// Replaces any polling task already running.
    pub fn start_polling(&mut self) {
        self.stop_polling();
        *self.inner.state.lock() = PollerState::Polling;
        info!(interval = ?self.interval, "Starting staleness polling");

        let source = Arc::clone(&self.source);
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // The first tick completes immediately
                ticker.tick().await;
                match Self::check(&source, &inner, &events).await {
                    CheckOutcome::Continue => {}
                    CheckOutcome::Stale => {
                        *inner.state.lock() = PollerState::StaleDetected;
                        if events.send(PollerEvent::StaleDataDetected).await.is_err() {
                            warn!("Poller event channel closed");
                        }
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the polling timer. Safe to call when already stopped.
    pub fn stop_polling(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped staleness polling");
        }
        let mut state = self.inner.state.lock();
        if *state == PollerState::Polling {
            *state = PollerState::Idle;
        }
    }

    /// User-triggered refresh after stale data was detected: forget the
    /// snapshot and start over, re-adopting the server clock on the next
    /// check without signalling.
    pub fn refresh(&mut self) {
        info!("Refresh triggered, restarting polling");
        self.inner.snapshot.store(SNAPSHOT_UNKNOWN, Ordering::SeqCst);
        self.start_polling();
    }

    async fn check(
        source: &C,
        inner: &PollerInner,
        events: &mpsc::Sender<PollerEvent>,
    ) -> CheckOutcome {
        let status = match source.fetch_status().await {
            Ok(status) => status,
            Err(e) if e.is_unauthorized() => {
                warn!("Status check unauthorized");
                if events.send(PollerEvent::Unauthorized).await.is_err() {
                    warn!("Poller event channel closed");
                }
                return CheckOutcome::Continue;
            }
            Err(e) => {
                // Keep the timer armed; the next tick retries
                debug!(error = %e, "Status check failed, retrying next tick");
                return CheckOutcome::Continue;
            }
        };

        if !status.success {
            return CheckOutcome::Continue;
        }
        let Some(server_ts) = status.last_write_timestamp else {
            return CheckOutcome::Continue;
        };

        let snapshot = inner.snapshot.load(Ordering::SeqCst);
        if snapshot == SNAPSHOT_UNKNOWN {
            // First observation, nothing to compare against yet
            debug!(timestamp = server_ts, "Adopted server write clock");
            inner.snapshot.store(server_ts, Ordering::SeqCst);
            CheckOutcome::Continue
        } else if server_ts > snapshot {
            warn!(server = server_ts, client = snapshot, "Stale data detected");
            CheckOutcome::Stale
        } else {
            debug!("Data is up to date");
            CheckOutcome::Continue
        }
    }
}

impl<C: StatusSource> Drop for StalenessPoller<C> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
