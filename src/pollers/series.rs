// =============================================================================
// SeriesPoller — OHLC-derived price series, 30 second cadence
// =============================================================================
//
// The selected timeframe is a request parameter: changing it invalidates every
// in-flight request and restarts the cycle from zero with an immediate fetch,
// so the user never waits out the remainder of a 30 s period to see the new
// window. A response is applied only when both its sequence number is current
// AND the timeframe it was issued for is still selected.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::exchange::PriceSeries;
use crate::fetch::{FetchError, FetchState, StateCell};
use crate::scheduler::Scheduler;
use crate::timeframe::Timeframe;

/// Scheduled cadence for series updates.
pub const SERIES_PERIOD: Duration = Duration::from_secs(30);

/// Anything that can produce a chart-ready series for a timeframe.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch_series(&self, timeframe: Timeframe) -> Result<PriceSeries, FetchError>;
}

/// Polls the exchange candle endpoint for the selected timeframe.
pub struct SeriesPoller {
    cell: StateCell<PriceSeries>,
    source: Arc<dyn SeriesSource>,
    scheduler: Scheduler,
    timeframe: RwLock<Timeframe>,
}

impl SeriesPoller {
    pub fn new(source: Arc<dyn SeriesSource>, version: Arc<AtomicU64>) -> Self {
        Self {
            cell: StateCell::new(version),
            source,
            scheduler: Scheduler::new(),
            timeframe: RwLock::new(Timeframe::default()),
        }
    }

    /// Begin the 30 s cycle with an immediate first fetch.
    pub fn start(self: Arc<Self>) {
        let poller = Arc::clone(&self);
        self.scheduler.start(SERIES_PERIOD, move || {
            let poller = Arc::clone(&poller);
            async move { poller.tick().await }
        });
    }

    /// Stop the cycle and discard any in-flight result on arrival.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.cell.invalidate();
    }

    /// One fetch attempt for the currently selected timeframe.
    pub async fn tick(&self) {
        let timeframe = *self.timeframe.read();
        let seq = self.cell.begin();
        let result = self.source.fetch_series(timeframe).await;
        if let Err(err) = &result {
            warn!(%timeframe, error = %err, "series fetch failed");
        }

        // The sequence was invalidated if the timeframe changed mid-flight,
        // but check the identity explicitly as well: a result for a stale
        // window must never be applied.
        if *self.timeframe.read() != timeframe {
            debug!(%timeframe, "series result for stale timeframe discarded");
            return;
        }
        if !self.cell.complete(seq, result) {
            debug!(%timeframe, seq, "stale series result discarded");
        }
    }

    /// Switch the selected timeframe.
    ///
    /// In-flight requests for the old window are invalidated; when the cycle
    /// is running it restarts from zero with an immediate fetch. While the
    /// gate is closed the selection is recorded without any network activity.
    pub fn set_timeframe(self: Arc<Self>, timeframe: Timeframe) {
        {
            let mut current = self.timeframe.write();
            if *current == timeframe {
                return;
            }
            *current = timeframe;
        }

        self.cell.invalidate();
        info!(%timeframe, "timeframe changed");

        if self.scheduler.is_running() {
            self.start();
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        *self.timeframe.read()
    }

    pub fn snapshot(&self) -> FetchState<PriceSeries> {
        self.cell.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchStatus;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Source that labels each series with the timeframe it was asked for,
    /// taking longer for the 1h window than the others.
    struct WindowedSource {
        calls: AtomicU32,
    }

    impl WindowedSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SeriesSource for WindowedSource {
        async fn fetch_series(&self, timeframe: Timeframe) -> Result<PriceSeries, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = match timeframe {
                Timeframe::OneHour => Duration::from_millis(50),
                _ => Duration::from_millis(5),
            };
            tokio::time::sleep(delay).await;
            Ok(PriceSeries {
                labels: vec![timeframe.as_str().to_string()],
                points: vec![1.0],
            })
        }
    }

    fn poller(source: Arc<dyn SeriesSource>) -> Arc<SeriesPoller> {
        Arc::new(SeriesPoller::new(source, Arc::new(AtomicU64::new(0))))
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timeframe_response_is_discarded() {
        let p = poller(WindowedSource::new());
        assert_eq!(p.timeframe(), Timeframe::OneHour);

        // Slow 1h fetch goes out, then the user switches to 1d.
        let p1 = p.clone();
        let slow = tokio::spawn(async move { p1.tick().await });
        tokio::task::yield_now().await;

        p.clone().set_timeframe(Timeframe::OneDay);
        let p2 = p.clone();
        let fast = tokio::spawn(async move { p2.tick().await });

        slow.await.unwrap();
        fast.await.unwrap();

        let state = p.snapshot();
        assert_eq!(state.status, FetchStatus::Ready);
        assert_eq!(state.value.as_ref().unwrap().labels, vec!["1d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeframe_change_restarts_the_cycle_immediately() {
        let source = WindowedSource::new();
        let p = poller(source.clone());
        p.clone().start();

        // First scheduled fetch at t = 0.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Mid-period switch triggers an immediate fetch for the new window.
        p.clone().set_timeframe(Timeframe::OneWeek);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(p.snapshot().value.as_ref().unwrap().labels, vec!["1w"]);
        assert!(p.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_the_same_timeframe_is_a_no_op() {
        let source = WindowedSource::new();
        let p = poller(source.clone());
        p.clone().start();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        p.clone().set_timeframe(Timeframe::OneHour);
        tokio::time::sleep(Duration::from_secs(5)).await;
        // No restart: the next fetch waits for the regular 30 s tick.
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeframe_change_while_stopped_stays_offline() {
        let source = WindowedSource::new();
        let p = poller(source.clone());

        p.clone().set_timeframe(Timeframe::OneMonth);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(p.timeframe(), Timeframe::OneMonth);
        assert!(!p.is_running());
    }
}
