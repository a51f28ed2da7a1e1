// =============================================================================
// Timeframe — user-selected chart window mapped to exchange kline parameters
// =============================================================================
//
// Each timeframe is a fixed `(interval, limit)` pair against the exchange
// candle endpoint, plus the label granularity used when shaping candles into
// a display series:
//
//   1h  => 12 x 5m  candles, minute-precision labels (HH:MM)
//   1d  => 24 x 1h  candles, hour-precision labels   (HH:00)
//   1w  => 42 x 4h  candles, date-precision labels   (Mon DD)
//   1m  => 30 x 1d  candles, date-precision labels   (Mon DD)

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Selected chart window. The mapping to exchange parameters is a pure
/// lookup and never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
}

impl Timeframe {
    /// Exchange kline interval code and candle count for this window.
    pub fn kline_params(self) -> (&'static str, u32) {
        match self {
            Self::OneHour => ("5m", 12),
            Self::OneDay => ("1h", 24),
            Self::OneWeek => ("4h", 42),
            Self::OneMonth => ("1d", 30),
        }
    }

    /// Format a candle open time (epoch ms) at this window's granularity.
    pub fn label(self, open_time_ms: i64) -> String {
        let ts = Utc
            .timestamp_millis_opt(open_time_ms)
            .single()
            .unwrap_or_default();
        match self {
            Self::OneHour => ts.format("%H:%M").to_string(),
            Self::OneDay => ts.format("%H:00").to_string(),
            Self::OneWeek | Self::OneMonth => ts.format("%b %d").to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::OneHour
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            "1m" => Ok(Self::OneMonth),
            other => Err(format!("unknown timeframe: '{other}'")),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kline_params_table() {
        assert_eq!(Timeframe::OneHour.kline_params(), ("5m", 12));
        assert_eq!(Timeframe::OneDay.kline_params(), ("1h", 24));
        assert_eq!(Timeframe::OneWeek.kline_params(), ("4h", 42));
        assert_eq!(Timeframe::OneMonth.kline_params(), ("1d", 30));
    }

    #[test]
    fn parse_and_display_round_trip() {
        for s in ["1h", "1d", "1w", "1m"] {
            let tf: Timeframe = s.parse().unwrap();
            assert_eq!(tf.to_string(), s);
        }
        assert!("2h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let tf: Timeframe = serde_json::from_str("\"1w\"").unwrap();
        assert_eq!(tf, Timeframe::OneWeek);
        assert_eq!(serde_json::to_string(&Timeframe::OneDay).unwrap(), "\"1d\"");
    }

    #[test]
    fn label_granularity_per_window() {
        // 2023-11-14 22:13:20 UTC
        let ms = 1_700_000_000_000;
        assert_eq!(Timeframe::OneHour.label(ms), "22:13");
        assert_eq!(Timeframe::OneDay.label(ms), "22:00");
        assert_eq!(Timeframe::OneWeek.label(ms), "Nov 14");
        assert_eq!(Timeframe::OneMonth.label(ms), "Nov 14");
    }
}
