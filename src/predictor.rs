// =============================================================================
// Predictor Client — multi-horizon forecast from the local prediction service
// =============================================================================
//
// GET {base}/predict/all returns an envelope:
//
//   { "success": bool, "predictions": { "1h": ..., "6h": ..., "24h": ... } }
//
// A well-formed response with `success: false` is a semantic failure
// (PredictionUnavailable), distinct from transport failures. All three
// horizons are required; a missing horizon fails the entire tick with a parse
// error — the consumer has no defined behavior for partial forecasts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fetch::FetchError;
use crate::pollers::forecast::ForecastSource;

/// At most this many factors are surfaced per horizon.
const MAX_TOP_FACTORS: usize = 3;

// =============================================================================
// Forecast data model
// =============================================================================

/// Predicted price direction relative to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// One model input ranked by feature importance (independent percentage,
/// not normalised across factors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorWeight {
    pub indicator: String,
    pub importance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// RSI reading plus its textual interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiReading {
    pub value: f64,
    pub signal: String,
}

/// Technical signal summary attached to a horizon's analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSummary {
    pub rsi: RsiReading,
    pub macd: String,
    pub nasdaq: String,
    pub us_market: String,
}

/// Optional narrative analysis for one horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_text: Option<String>,
    #[serde(default)]
    pub top_factors: Vec<FactorWeight>,
    pub signals: SignalSummary,
}

/// Forecast for a single horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub current_price: f64,
    pub predicted_price: f64,
    pub change_percent: f64,
    pub direction: Direction,
    /// Model confidence in percent, 0–100.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDetail>,
}

/// All three horizons. Every field is required: deserialization fails when a
/// horizon is absent, which is exactly the whole-set-fails policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSet {
    #[serde(rename = "1h")]
    pub one_hour: ForecastEntry,
    #[serde(rename = "6h")]
    pub six_hours: ForecastEntry,
    #[serde(rename = "24h")]
    pub twenty_four_hours: ForecastEntry,
}

impl ForecastSet {
    /// Cap each horizon's factor list at the display limit.
    fn truncate_factors(&mut self) {
        for entry in [
            &mut self.one_hour,
            &mut self.six_hours,
            &mut self.twenty_four_hours,
        ] {
            if let Some(analysis) = entry.analysis.as_mut() {
                analysis.top_factors.truncate(MAX_TOP_FACTORS);
            }
        }
    }
}

// =============================================================================
// PredictorClient
// =============================================================================

/// REST client for the local prediction service.
#[derive(Debug, Clone)]
pub struct PredictorClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// GET /predict/all and interpret the envelope.
    pub async fn get_forecasts(&self) -> Result<ForecastSet, FetchError> {
        let url = format!("{}/predict/all", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "prediction service returned {status}"
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(FetchError::from_reqwest)?;
        let set = forecasts_from_json(&body)?;

        debug!(
            h1 = set.one_hour.predicted_price,
            h6 = set.six_hours.predicted_price,
            h24 = set.twenty_four_hours.predicted_price,
            "forecasts fetched"
        );
        Ok(set)
    }
}

#[async_trait]
impl ForecastSource for PredictorClient {
    async fn fetch_forecast(&self) -> Result<ForecastSet, FetchError> {
        self.get_forecasts().await
    }
}

// =============================================================================
// Transformer (envelope -> ForecastSet)
// =============================================================================

/// Interpret the `/predict/all` envelope.
pub fn forecasts_from_json(body: &serde_json::Value) -> Result<ForecastSet, FetchError> {
    let success = body["success"]
        .as_bool()
        .ok_or_else(|| FetchError::Parse("response missing 'success' flag".into()))?;

    if !success {
        return Err(FetchError::PredictionUnavailable(
            "service reported success=false".into(),
        ));
    }

    let predictions = body
        .get("predictions")
        .cloned()
        .ok_or_else(|| FetchError::Parse("response missing 'predictions'".into()))?;

    let mut set: ForecastSet = serde_json::from_value(predictions)
        .map_err(|e| FetchError::Parse(format!("malformed predictions: {e}")))?;
    set.truncate_factors();
    Ok(set)
}
