// =============================================================================
// Gate — disclaimer acknowledgement switch controlling all polling
// =============================================================================
//
// No network activity happens until the gate opens. Opening starts all three
// pollers (each with an immediate first fetch); closing stops all three
// schedulers unconditionally and invalidates every in-flight request, so a
// response arriving after close is discarded rather than applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::pollers::{ForecastPoller, SeriesPoller, TickerPoller};

/// Activation switch for the three pollers. `open`/`close` are the only
/// mutators of the gate state.
pub struct Gate {
    open: AtomicBool,
    ticker: Arc<TickerPoller>,
    series: Arc<SeriesPoller>,
    forecast: Arc<ForecastPoller>,
}

impl Gate {
    /// Create a closed gate wired to the three pollers.
    pub fn new(
        ticker: Arc<TickerPoller>,
        series: Arc<SeriesPoller>,
        forecast: Arc<ForecastPoller>,
    ) -> Self {
        Self {
            open: AtomicBool::new(false),
            ticker,
            series,
            forecast,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Open the gate. The closed -> open transition starts all three pollers;
    /// opening an already-open gate does nothing.
    pub fn open(&self) {
        if self.open.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("gate opened — starting all pollers");
        Arc::clone(&self.ticker).start();
        Arc::clone(&self.series).start();
        Arc::clone(&self.forecast).start();
    }

    /// Close the gate and stop all three pollers unconditionally, even if a
    /// fetch is in flight.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        info!("gate closed — stopping all pollers");
        self.ticker.stop();
        self.series.stop();
        self.forecast.stop();
    }
}
