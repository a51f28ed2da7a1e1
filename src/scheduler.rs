// =============================================================================
// Scheduler — owned repeating timer with explicit start/stop
// =============================================================================
//
// Each poller owns one Scheduler instance; there are no ambient process-wide
// timers. `start` fires the action immediately once and then every `period`.
// Ticks are awaited serially inside the task (missed ticks are delayed, not
// bunched), so scheduled ticks for one poller never overlap; concurrency only
// arises from manual refresh, which the StateCell sequence resolves.
//
// `stop` aborts the task at its next await point. A fetch already past the
// network boundary may still resolve afterwards; callers pair `stop` with
// `StateCell::invalidate` so such results are discarded rather than applied.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Repeating-timer handle. Starting a new repetition implicitly stops any
/// prior one; `stop` is idempotent.
pub struct Scheduler {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    /// Begin invoking `action` immediately once, then every `period`.
    pub fn start<F, Fut>(&self, period: Duration, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut slot = self.task.lock();
        if let Some(prev) = slot.take() {
            prev.abort();
        }

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately.
                interval.tick().await;
                action().await;
            }
        });

        debug!(period_ms = period.as_millis() as u64, "scheduler started");
        *slot = Some(handle);
    }

    /// Stop the current repetition. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!("scheduler stopped");
        }
    }

    /// Whether a repetition is currently active.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |h| !h.is_finished())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_invocation_is_immediate() {
        let count = Arc::new(AtomicU32::new(0));
        let sched = Scheduler::new();
        let c = count.clone();
        sched.start(Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_every_period() {
        let count = Arc::new(AtomicU32::new(0));
        let sched = Scheduler::new();
        let c = count.clone();
        sched.start(Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Ticks at t = 0, 10, 20.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_invocations_and_is_idempotent() {
        let count = Arc::new(AtomicU32::new(0));
        let sched = Scheduler::new();
        let c = count.clone();
        sched.start(Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(15)).await;
        let before = count.load(Ordering::SeqCst);
        assert_eq!(before, 2);

        sched.stop();
        sched.stop();
        assert!(!sched.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_repetition() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let sched = Scheduler::new();

        let c = first.clone();
        sched.start(Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let c = second.clone();
        sched.start(Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }
}
