//! Lifecycle-scoped periodic timer

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Handle to a running interval timer.
///
/// The first tick fires immediately. Dropping the handle stops the timer;
/// no tick is delivered once `drop` has returned on the owning task.
pub struct TimerHandle {
    period: Duration,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Start a timer that calls `on_tick` every `period`.
    ///
    /// Must be called from within a tokio runtime. `period` must be non-zero.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            // A slow runtime should not produce a burst of catch-up fetches
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        debug!(period_ms = period.as_millis() as u64, "Timer stopped");
                        break;
                    }
                    _ = ticker.tick() => on_tick(),
                }
            }
        });

        Self {
            period,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. Equivalent to dropping the handle.
    pub fn cancel(self) {}

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.abort();
    }
}
