// =============================================================================
// Exchange Client — Binance public market data (ticker + klines)
// =============================================================================
//
// Only two public endpoints are consumed, both unauthenticated:
//
//   GET /api/v3/ticker/24hr  — last traded price + 24h percent change
//   GET /api/v3/klines       — candle series, array-of-arrays format
//
// Binance returns numeric fields as strings; `parse_str_f64` accepts either.
// The client carries an explicit 10 s timeout since the endpoints impose none.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::fetch::FetchError;
use crate::pollers::series::SeriesSource;
use crate::pollers::ticker::TickerSource;
use crate::timeframe::Timeframe;

/// The one symbol this service tracks.
pub const SYMBOL: &str = "BTCUSDT";

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

// =============================================================================
// Display shapes
// =============================================================================

/// Current price card data, shaped from one 24h ticker response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSnapshot {
    pub price: f64,
    pub change_percent: f64,
}

/// Chart-ready series: `labels[i]` is the display timestamp for `points[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub labels: Vec<String>,
    pub points: Vec<f64>,
}

/// One candle from the klines endpoint. Only the open time and close price
/// are consumed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub close: f64,
}

// =============================================================================
// ExchangeClient
// =============================================================================

/// REST client for the public Binance market-data endpoints.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// GET /api/v3/ticker/24hr for [`SYMBOL`].
    pub async fn get_ticker(&self) -> Result<TickerSnapshot, FetchError> {
        let url = format!("{}/api/v3/ticker/24hr?symbol={}", self.base_url, SYMBOL);
        let body = self.get_json(&url).await?;
        let snapshot = ticker_from_json(&body)?;

        debug!(price = snapshot.price, change = snapshot.change_percent, "ticker fetched");
        Ok(snapshot)
    }

    /// GET /api/v3/klines for [`SYMBOL`] with the given timeframe's parameters.
    pub async fn get_klines(&self, timeframe: Timeframe) -> Result<Vec<Candle>, FetchError> {
        let (interval, limit) = timeframe.kline_params();
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, SYMBOL, interval, limit
        );
        let body = self.get_json(&url).await?;
        let candles = candles_from_json(&body)?;

        debug!(%timeframe, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "exchange returned {status} for {url}"
            )));
        }

        resp.json().await.map_err(FetchError::from_reqwest)
    }
}

impl Default for ExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickerSource for ExchangeClient {
    async fn fetch_ticker(&self) -> Result<TickerSnapshot, FetchError> {
        self.get_ticker().await
    }
}

#[async_trait]
impl SeriesSource for ExchangeClient {
    async fn fetch_series(&self, timeframe: Timeframe) -> Result<PriceSeries, FetchError> {
        let candles = self.get_klines(timeframe).await?;
        series_from_candles(timeframe, &candles)
    }
}

// =============================================================================
// Transformers (raw payload -> display shape)
// =============================================================================

/// Shape a 24h ticker payload into a [`TickerSnapshot`].
pub fn ticker_from_json(body: &serde_json::Value) -> Result<TickerSnapshot, FetchError> {
    let price = parse_str_f64(&body["lastPrice"])
        .ok_or_else(|| FetchError::Parse("ticker response missing 'lastPrice'".into()))?;
    let change_percent = parse_str_f64(&body["priceChangePercent"]).ok_or_else(|| {
        FetchError::Parse("ticker response missing 'priceChangePercent'".into())
    })?;

    Ok(TickerSnapshot {
        price,
        change_percent,
    })
}

/// Parse the klines array-of-arrays payload.
///
/// Array indices: [0] openTime, [4] close — the rest is unused.
pub fn candles_from_json(body: &serde_json::Value) -> Result<Vec<Candle>, FetchError> {
    let raw = body
        .as_array()
        .ok_or_else(|| FetchError::Parse("klines response is not an array".into()))?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry
            .as_array()
            .ok_or_else(|| FetchError::Parse("kline entry is not an array".into()))?;
        if arr.len() < 5 {
            return Err(FetchError::Parse(format!(
                "kline entry has {} elements, expected at least 5",
                arr.len()
            )));
        }

        let open_time = arr[0]
            .as_i64()
            .ok_or_else(|| FetchError::Parse("kline open time is not an integer".into()))?;
        let close = parse_str_f64(&arr[4])
            .ok_or_else(|| FetchError::Parse("kline close price is not numeric".into()))?;

        candles.push(Candle { open_time, close });
    }

    Ok(candles)
}

/// Shape an ordered candle payload into a chart-ready [`PriceSeries`]:
/// label = open time at the timeframe's granularity, point = close price.
pub fn series_from_candles(
    timeframe: Timeframe,
    candles: &[Candle],
) -> Result<PriceSeries, FetchError> {
    if candles.is_empty() {
        return Err(FetchError::Parse("klines response is empty".into()));
    }

    let labels = candles
        .iter()
        .map(|c| timeframe.label(c.open_time))
        .collect();
    let points = candles.iter().map(|c| c.close).collect();

    Ok(PriceSeries { labels, points })
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Option<f64> {
    if let Some(s) = val.as_str() {
        s.parse().ok()
    } else {
        val.as_f64()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ticker_parses_numeric_strings() {
        let body = json!({
            "lastPrice": "64250.10",
            "priceChangePercent": "-1.42",
        });
        let snap = ticker_from_json(&body).unwrap();
        assert!((snap.price - 64250.10).abs() < f64::EPSILON);
        assert!((snap.change_percent + 1.42).abs() < f64::EPSILON);
    }

    #[test]
    fn ticker_missing_field_is_parse_error() {
        let body = json!({ "lastPrice": "64250.10" });
        let err = ticker_from_json(&body).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    fn kline_entry(open_time: i64, close: f64) -> serde_json::Value {
        json!([
            open_time,
            "0",
            "0",
            "0",
            close.to_string(),
            "0",
            open_time + 1,
            "0",
            0,
            "0",
            "0"
        ])
    }

    #[test]
    fn twelve_candles_produce_aligned_series() {
        let base = 1_700_000_000_000_i64;
        let raw: Vec<_> = (0..12)
            .map(|i| kline_entry(base + i * 300_000, 60_000.0 + i as f64))
            .collect();
        let candles = candles_from_json(&json!(raw)).unwrap();
        assert_eq!(candles.len(), 12);

        let series = series_from_candles(Timeframe::OneHour, &candles).unwrap();
        assert_eq!(series.labels.len(), 12);
        assert_eq!(series.points.len(), 12);
        for (i, point) in series.points.iter().enumerate() {
            assert!((point - (60_000.0 + i as f64)).abs() < f64::EPSILON);
        }
        // Minute precision for the 1h window.
        assert_eq!(series.labels[0], "22:13");
        assert_eq!(series.labels[1], "22:18");
    }

    #[test]
    fn empty_candle_payload_is_parse_error() {
        let candles = candles_from_json(&json!([])).unwrap();
        let err = series_from_candles(Timeframe::OneDay, &candles).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn malformed_kline_entry_fails_the_whole_payload() {
        let body = json!([[1_700_000_000_000_i64, "1", "2"]]);
        assert_eq!(candles_from_json(&body).unwrap_err().kind(), "parse");

        let body = json!({ "not": "an array" });
        assert_eq!(candles_from_json(&body).unwrap_err().kind(), "parse");
    }
}
