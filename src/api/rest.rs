// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. This surface is the presentation
// layer's entire contract: it reads snapshots and may refresh a poller,
// change the series timeframe, or open/close the gate — it never mutates
// fetch state directly. CORS is configured permissively for development.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::timeframe::Timeframe;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/gate/open", post(gate_open))
        .route("/api/v1/gate/close", post(gate_close))
        .route("/api/v1/ticker/refresh", post(ticker_refresh))
        .route("/api/v1/forecast/refresh", post(forecast_refresh))
        .route("/api/v1/timeframe", post(set_timeframe))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Full state snapshot
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Gate control
// =============================================================================

#[derive(Serialize)]
struct GateResponse {
    gate_open: bool,
}

async fn gate_open(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.gate.open();
    info!("gate opened via API");
    Json(GateResponse { gate_open: true })
}

async fn gate_close(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.gate.close();
    info!("gate closed via API");
    Json(GateResponse { gate_open: false })
}

// =============================================================================
// Manual refresh
// =============================================================================

fn gate_closed_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::CONFLICT,
        Json(serde_json::json!({ "error": "gate is closed" })),
    )
}

async fn ticker_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !state.gate.is_open() {
        return Err(gate_closed_error());
    }
    state.ticker.refresh().await;
    Ok(Json(state.ticker.snapshot()))
}

async fn forecast_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !state.gate.is_open() {
        return Err(gate_closed_error());
    }
    state.forecast.refresh().await;
    Ok(Json(state.forecast.snapshot()))
}

// =============================================================================
// Timeframe selection
// =============================================================================

#[derive(Deserialize)]
struct TimeframeRequest {
    timeframe: String,
}

#[derive(Serialize)]
struct TimeframeResponse {
    timeframe: Timeframe,
}

async fn set_timeframe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimeframeRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let timeframe: Timeframe = req.timeframe.parse().map_err(|e: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e })),
        )
    })?;

    state.series.clone().set_timeframe(timeframe);
    Ok(Json(TimeframeResponse { timeframe }))
}
