// =============================================================================
// ForecastPoller — multi-horizon predictions, 60 second cadence
// =============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::fetch::{FetchError, FetchState, StateCell};
use crate::predictor::ForecastSet;
use crate::scheduler::Scheduler;

/// Scheduled cadence for forecast updates.
pub const FORECAST_PERIOD: Duration = Duration::from_secs(60);

/// Anything that can produce the three-horizon forecast set.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_forecast(&self) -> Result<ForecastSet, FetchError>;
}

/// Polls the prediction service's aggregate endpoint.
pub struct ForecastPoller {
    cell: StateCell<ForecastSet>,
    source: Arc<dyn ForecastSource>,
    scheduler: Scheduler,
}

impl ForecastPoller {
    pub fn new(source: Arc<dyn ForecastSource>, version: Arc<AtomicU64>) -> Self {
        Self {
            cell: StateCell::new(version),
            source,
            scheduler: Scheduler::new(),
        }
    }

    /// Begin the 60 s cycle with an immediate first fetch.
    pub fn start(self: Arc<Self>) {
        let poller = Arc::clone(&self);
        self.scheduler.start(FORECAST_PERIOD, move || {
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
        let result = self.source.fetch_forecast().await;
        if let Err(err) = &result {
            warn!(error = %err, "forecast fetch failed");
        }
        if !self.cell.complete(seq, result) {
            debug!(seq, "stale forecast result discarded");
        }
    }

    /// Manual immediate re-fetch, same contract as the ticker's refresh.
    pub async fn refresh(&self) {
        self.tick().await;
    }

    pub fn snapshot(&self) -> FetchState<ForecastSet> {
        self.cell.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}
