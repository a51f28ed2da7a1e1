// =============================================================================
// PricePulse — Main Entry Point
// =============================================================================
//
// A live-data synchronization service: three pollers (spot ticker, OHLC price
// series, multi-horizon forecast) are kept in step with their remote sources
// and exposed through a small REST surface. The engine starts with the gate
// closed — no network activity happens until the disclaimer is acknowledged
// and the gate is opened through the API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod exchange;
mod fetch;
mod gate;
mod pollers;
mod predictor;
mod scheduler;
mod timeframe;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        PricePulse Sync Engine — Starting Up              ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config = Config::from_env();
    info!(
        predictor_url = %config.predictor_url,
        bind_addr = %config.bind_addr,
        symbol = exchange::SYMBOL,
        "configuration resolved"
    );

    // ── 2. Build shared state (gate closed, all pollers idle) ───────────
    let state = Arc::new(AppState::new(config.clone()));
    info!("gate is closed — pollers idle until the disclaimer is acknowledged");

    // ── 3. Serve the REST API ────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "API server exited");
        }
    });

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received — stopping gracefully");

    state.gate.close();
    server.abort();

    info!("PricePulse shut down complete.");
    Ok(())
}
