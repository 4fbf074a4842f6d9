//! Candle data structure.

use candlewick_types::{BucketKey, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Finality of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleState {
    /// Bucket end lies after the finality boundary; may still change.
    #[default]
    Pending,
    /// Whole bucket lies at or before the finality boundary.
    Materialized,
}

impl CandleState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Materialized => "materialized",
        }
    }

    /// Returns true for [`CandleState::Materialized`].
    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized)
    }
}

impl std::fmt::Display for CandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OHLCV+VWAP candle for one bucket key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start (aligned to the timeframe).
    pub bucket_start: DateTime<Utc>,
    /// Trading symbol.
    pub symbol: String,
    /// Candle resolution.
    pub timeframe: Timeframe,
    /// Price of the earliest tick.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Price of the latest tick.
    pub close: f64,
    /// Total traded volume.
    pub volume: f64,
    /// Volume-weighted average price, absent when volume is zero.
    pub vwap: Option<f64>,
    /// Number of ticks folded into the candle.
    pub tick_count: u64,
    /// Finality of the candle.
    pub state: CandleState,
}

impl Candle {
    /// Returns the bucket key of this candle.
    #[must_use]
    pub fn key(&self) -> BucketKey {
        BucketKey {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            bucket_start: self.bucket_start,
        }
    }

    /// Returns the exclusive end of the bucket.
    #[must_use]
    pub fn bucket_end(&self) -> DateTime<Utc> {
        self.bucket_start + self.timeframe.duration()
    }

    /// Returns true if the candle is materialized.
    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        self.state.is_materialized()
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) candle.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) candle.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
