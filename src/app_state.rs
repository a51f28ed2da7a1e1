// =============================================================================
// Central Application State — PricePulse sync engine
// =============================================================================
//
// Ties the three pollers and the gate together and builds the unified
// snapshot served to the dashboard. The pollers share nothing but the
// state-version counter; each owns its fetch state exclusively.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::exchange::{ExchangeClient, PriceSeries, TickerSnapshot, SYMBOL};
use crate::fetch::FetchState;
use crate::gate::Gate;
use crate::pollers::{ForecastPoller, SeriesPoller, TickerPoller};
use crate::predictor::{ForecastSet, PredictorClient};
use crate::timeframe::Timeframe;

/// Shared application state, wrapped in `Arc` for the API handlers.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every applied
    /// state mutation so clients can detect fresh data cheaply.
    pub state_version: Arc<AtomicU64>,

    pub config: Config,
    pub gate: Gate,
    pub ticker: Arc<TickerPoller>,
    pub series: Arc<SeriesPoller>,
    pub forecast: Arc<ForecastPoller>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire up clients, pollers, and the (closed) gate from `config`.
    pub fn new(config: Config) -> Self {
        let state_version = Arc::new(AtomicU64::new(1));

        let exchange = Arc::new(ExchangeClient::new());
        let predictor = Arc::new(PredictorClient::new(config.predictor_url.clone()));

        let ticker = Arc::new(TickerPoller::new(exchange.clone(), state_version.clone()));
        let series = Arc::new(SeriesPoller::new(exchange, state_version.clone()));
        let forecast = Arc::new(ForecastPoller::new(predictor, state_version.clone()));

        let gate = Gate::new(ticker.clone(), series.clone(), forecast.clone());

        Self {
            state_version,
            config,
            gate,
            ticker,
            series,
            forecast,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Build the complete snapshot served by `GET /api/v1/state`.
    pub fn build_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: chrono::Utc::now().timestamp_millis(),
            uptime_s: self.start_time.elapsed().as_secs(),
            symbol: SYMBOL,
            gate_open: self.gate.is_open(),
            ticker: self.ticker.snapshot(),
            series: SeriesView {
                timeframe: self.series.timeframe(),
                state: self.series.snapshot(),
            },
            forecast: self.forecast.snapshot(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full engine state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_s: u64,
    pub symbol: &'static str,
    pub gate_open: bool,
    pub ticker: FetchState<TickerSnapshot>,
    pub series: SeriesView,
    pub forecast: FetchState<ForecastSet>,
}

/// The series state together with the timeframe it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesView {
    pub timeframe: Timeframe,
    pub state: FetchState<PriceSeries>,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchStatus;

    #[tokio::test]
    async fn fresh_state_snapshot_is_idle_and_gated() {
        let state = AppState::new(Config::default());
        let snap = state.build_snapshot();

        assert!(!snap.gate_open);
        assert_eq!(snap.symbol, "BTCUSDT");
        assert_eq!(snap.ticker.status, FetchStatus::Idle);
        assert_eq!(snap.series.state.status, FetchStatus::Idle);
        assert_eq!(snap.series.timeframe, Timeframe::OneHour);
        assert_eq!(snap.forecast.status, FetchStatus::Idle);
        assert!(snap.state_version >= 1);
    }

    #[tokio::test]
    async fn snapshot_serializes_for_the_dashboard() {
        let state = AppState::new(Config::default());
        let json = serde_json::to_value(state.build_snapshot()).unwrap();

        assert_eq!(json["gate_open"], false);
        assert_eq!(json["ticker"]["status"], "idle");
        assert_eq!(json["series"]["timeframe"], "1h");
        assert!(json["forecast"]["value"].is_null());
    }
}
