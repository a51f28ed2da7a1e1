// =============================================================================
// TickerPoller — current price + 24h change, 10 second cadence
// =============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::exchange::TickerSnapshot;
use crate::fetch::{FetchError, FetchState, StateCell};
use crate::scheduler::Scheduler;

/// Scheduled cadence for ticker updates.
pub const TICKER_PERIOD: Duration = Duration::from_secs(10);

/// Anything that can produce a shaped ticker snapshot.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_ticker(&self) -> Result<TickerSnapshot, FetchError>;
}

/// Polls the exchange 24h ticker and maintains its fetch state.
pub struct TickerPoller {
    cell: StateCell<TickerSnapshot>,
    source: Arc<dyn TickerSource>,
    scheduler: Scheduler,
}

impl TickerPoller {
    pub fn new(source: Arc<dyn TickerSource>, version: Arc<AtomicU64>) -> Self {
        Self {
            cell: StateCell::new(version),
            source,
            scheduler: Scheduler::new(),
        }
    }

    /// Begin the 10 s cycle with an immediate first fetch.
    pub fn start(self: Arc<Self>) {
        let poller = Arc::clone(&self);
        self.scheduler.start(TICKER_PERIOD, move || {
            let poller = Arc::clone(&poller);
            async move { poller.tick().await }
        });
    }

    /// Stop the cycle and discard any in-flight result on arrival.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.cell.invalidate();
    }

    /// One fetch attempt, gated by the request sequence.
    pub async fn tick(&self) {
        let seq = self.cell.begin();
        let result = self.source.fetch_ticker().await;
        if let Err(err) = &result {
            warn!(error = %err, "ticker fetch failed");
        }
        if !self.cell.complete(seq, result) {
            debug!(seq, "stale ticker result discarded");
        }
    }

    /// Manual immediate re-fetch. Races against the scheduled tick are
    /// resolved by newest-request-wins.
    pub async fn refresh(&self) {
        self.tick().await;
    }

    pub fn snapshot(&self) -> FetchState<TickerSnapshot> {
        self.cell.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}
