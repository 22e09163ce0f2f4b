//! View polling
//!
//! A [`Poller`] owns one [`View`] and refreshes it on a fixed interval.
//! Every fetch carries a sequence number taken when it is issued. Only the
//! result of the most recently issued fetch is committed; anything that
//! completes after a newer fetch was issued is discarded, so a slow response
//! can never overwrite a more recent one. Once the poller is unmounted no
//! completion touches its state.

mod timer;


pub use timer::TimerHandle;

use crate::error::{DashboardError, RETRIEVAL_FAILED};
use crate::observability::DashboardMetrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Refresh intervals offered by the dashboard
pub const REFRESH_INTERVALS: [Duration; 4] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(60),
    Duration::from_secs(300),
];

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// A source of view data: facade calls followed by pure transforms
#[async_trait]
pub trait View: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Label used in logs and metrics
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Self::Output, DashboardError>;
}

/// Snapshot of a polled view
#[derive(Debug)]
pub struct ViewState<T> {
    /// Last successfully fetched data
    pub data: Option<Arc<T>>,
    /// Set when the last committed fetch failed
    pub error: Option<String>,
    /// True while at least one fetch is in flight
    pub loading: bool,
    /// Sequence number of the last committed fetch, 0 before the first one
    pub sequence: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            sequence: 0,
            updated_at: None,
        }
    }
}

impl<T> Clone for ViewState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            loading: self.loading,
            sequence: self.sequence,
            updated_at: self.updated_at,
        }
    }
}

/// Counters for one poller.
///
/// Every issued fetch ends up in exactly one of `committed`, `failures` or
/// `discarded`, or is dropped silently after unmount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub issued: u64,
    pub committed: u64,
    pub failures: u64,
    pub discarded: u64,
}

#[derive(Default)]
struct Counters {
    committed: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

enum Outcome {
    Committed,
    Failed(DashboardError),
    Stale(Option<DashboardError>),
    Unmounted,
}

struct Shared<V: View> {
    view: V,
    alive: AtomicBool,
    next_sequence: AtomicU64,
    in_flight: AtomicUsize,
    state_tx: watch::Sender<ViewState<V::Output>>,
    counters: Counters,
    metrics: DashboardMetrics,
}

impl<V: View> Shared<V> {
    /// Issue one fetch on its own task
    fn issue(self: &Arc<Self>) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state_tx.send_if_modified(|state| {
            let changed = !state.loading;
            state.loading = true;
            changed
        });
        debug!(view = self.view.name(), sequence, "Fetch issued");

        let mut in_flight = InFlight {
            shared: Arc::clone(self),
            sequence,
            settled: false,
        };
        tokio::spawn(async move {
            let start = Instant::now();
            let result = in_flight.shared.view.fetch().await;
            in_flight.settled = true;
            in_flight.shared.complete(sequence, result, start.elapsed());
        });
    }

    /// Settle a fetch whose task ended without a result (the view panicked)
    fn abandon(&self, sequence: u64) {
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        let mut latest = None;

        self.state_tx.send_if_modified(|state| {
            if !self.alive.load(Ordering::SeqCst) {
                return false;
            }

            let is_latest = sequence >= self.next_sequence.load(Ordering::SeqCst);
            if is_latest {
                state.sequence = sequence;
                state.updated_at = Some(Utc::now());
                state.error = Some(RETRIEVAL_FAILED.to_string());
            }
            state.loading = remaining > 0;
            latest = Some(is_latest);
            true
        });

        let view = self.view.name();
        match latest {
            Some(true) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                self.metrics.inc_poll_failures(view);
                warn!(view, sequence, "Fetch task ended without a result");
            }
            Some(false) => {
                self.counters.discarded.fetch_add(1, Ordering::SeqCst);
                self.metrics.inc_stale_discarded(view);
                debug!(view, sequence, "Discarding stale fetch that ended without a result");
            }
            None => {
                debug!(view, sequence, "View unmounted, dropping abandoned fetch");
            }
        }
    }
}

/// Owned by a fetch task; settles the fetch on drop unless it completed
struct InFlight<V: View> {
    shared: Arc<Shared<V>>,
    sequence: u64,
    settled: bool,
}

impl<V: View> Drop for InFlight<V> {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.abandon(self.sequence);
        }
    }
}

/// Periodically refreshes a [`View`] and publishes its state.
///
/// Dropping the poller is equivalent to calling [`Poller::unmount`].
pub struct Poller<V: View> {
    shared: Arc<Shared<V>>,
    timer: Option<TimerHandle>,
}

impl<V: View> Poller<V> {
    /// Start polling `view` every `interval`; the first fetch is issued
    /// immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(view: V, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(ViewState::default());
        let shared = Arc::new(Shared {
            view,
            alive: AtomicBool::new(true),
            next_sequence: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            state_tx,
            counters: Counters::default(),
            metrics: DashboardMetrics::new(),
        });

        info!(view = shared.view.name(), "Mounting view");

        let mut poller = Self {
            shared,
            timer: None,
        };
        poller.arm(interval);
        poller
    }

    /// Replace the refresh interval.
    ///
    /// The running timer is stopped before the new one starts, and the new
    /// timer fetches immediately.
    pub fn set_interval(&mut self, interval: Duration) {
        // Stop the old timer first so two never run side by side
        self.timer.take();
        self.arm(interval);
    }

    fn arm(&mut self, interval: Duration) {
        if !self.shared.alive.load(Ordering::SeqCst) {
            return;
        }

        let interval = if interval.is_zero() {
            warn!(
                view = self.shared.view.name(),
                "Zero refresh interval, using the default"
            );
            DEFAULT_REFRESH_INTERVAL
        } else {
            interval
        };

        debug!(
            view = self.shared.view.name(),
            interval_ms = interval.as_millis() as u64,
            "Arming refresh timer"
        );

        let shared = Arc::clone(&self.shared);
        self.timer = Some(TimerHandle::spawn(interval, move || shared.issue()));
    }

    /// Current refresh interval, `None` once unmounted
    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(TimerHandle::period)
    }

    /// Issue one fetch outside the regular schedule
    pub fn refresh_now(&self) {
        self.shared.issue();
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<V::Output>> {
        self.shared.state_tx.subscribe()
    }

    pub fn state(&self) -> ViewState<V::Output> {
        self.shared.state_tx.borrow().clone()
    }

    pub fn stats(&self) -> PollerStats {
        let counters = &self.shared.counters;
        PollerStats {
            issued: self.shared.next_sequence.load(Ordering::SeqCst),
            committed: counters.committed.load(Ordering::SeqCst),
            failures: counters.failures.load(Ordering::SeqCst),
            discarded: counters.discarded.load(Ordering::SeqCst),
        }
    }

    pub fn view(&self) -> &V {
        &self.shared.view
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Stop the timer and drop every fetch still in flight
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.timer.take();

        let mut was_alive = false;
        self.shared.state_tx.send_if_modified(|state| {
            was_alive = self.shared.alive.swap(false, Ordering::SeqCst);
            let changed = state.loading;
            state.loading = false;
            changed
        });

        if was_alive {
            info!(view = self.shared.view.name(), "View unmounted");
        }
    }
}

impl<V: View> Drop for Poller<V> {
    fn drop(&mut self) {
        self.teardown();
    }
}
