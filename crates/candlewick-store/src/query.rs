//! Read interface over candle snapshots.

use std::ops::Bound;

use candlewick_aggregate::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandleSnapshot, SymbolSeries};

/// Filter for candle reads. Both bounds are inclusive on bucket start.
///
/// Only materialized candles are returned unless
/// [`including_pending`](Self::including_pending) is set, so reads agree
/// with [`CandleSnapshot::readiness`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandleQuery {
    /// Earliest bucket start to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest bucket start to include.
    pub to: Option<DateTime<Utc>>,
    /// Keep only the most recent N candles.
    pub limit: Option<usize>,
    /// Also return pending candles inside the safety lag.
    pub include_pending: bool,
}

impl CandleQuery {
    /// Creates an unbounded query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            from: None,
            to: None,
            limit: None,
            include_pending: false,
        }
    }

    /// Sets both bounds.
    #[must_use]
    pub const fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Keeps only the most recent `limit` candles.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Also returns pending candles whose bucket is not final yet.
    #[must_use]
    pub const fn including_pending(mut self) -> Self {
        self.include_pending = true;
        self
    }

    fn select<'a>(&self, series: &'a SymbolSeries) -> Vec<&'a Candle> {
        if matches!((self.from, self.to), (Some(from), Some(to)) if from > to) {
            return Vec::new();
        }
        let lower = self.from.map_or(Bound::Unbounded, Bound::Included);
        let upper = self.to.map_or(Bound::Unbounded, Bound::Included);
        let mut selected: Vec<&Candle> = series
            .range((lower, upper))
            .map(|(_, candle)| candle)
            .filter(|candle| self.include_pending || candle.is_materialized())
            .collect();
        if let Some(limit) = self.limit {
            let skip = selected.len().saturating_sub(limit);
            selected.drain(..skip);
        }
        selected
    }
}

/// Readiness of a symbol at one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Fewer materialized candles than required.
    Insufficient,
    /// At least the required number of materialized candles.
    Ready,
    /// Fewer than required because retention removed candles that would
    /// otherwise have sufficed.
    ReducedByRetention,
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Insufficient => "insufficient",
            Self::Ready => "ready",
            Self::ReducedByRetention => "reduced by retention",
        })
    }
}

/// Answer of the readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// Classified state.
    pub state: ReadinessState,
    /// True when `count >= required`.
    pub ready: bool,
    /// Materialized candles available.
    pub count: usize,
    /// Candles the consumer asked for.
    pub required: usize,
    /// Materialized candles removed by retention.
    pub retired: u64,
}

/// Summary statistics over a candle range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    /// Candles in the range.
    pub candle_count: usize,
    /// Lowest low.
    pub min_low: f64,
    /// Highest high.
    pub max_high: f64,
    /// Mean of the typical prices.
    pub mean_typical_price: f64,
    /// Close of the earliest candle.
    pub first_close: f64,
    /// Close of the latest candle.
    pub last_close: f64,
    /// Sum of volumes.
    pub total_volume: f64,
    /// Percent change from first to last close, absent when the first close is zero.
    pub change_percent: Option<f64>,
}

impl CandleSnapshot {
    /// Returns candles for `symbol` ascending by bucket start.
    ///
    /// Unknown symbols, retired ranges and empty ranges yield an empty vector.
    #[must_use]
    pub fn candles(&self, symbol: &str, query: &CandleQuery) -> Vec<Candle> {
        self.series(symbol)
            .map(|series| query.select(series).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the most recent candle for `symbol` matching `query`.
    #[must_use]
    pub fn latest(&self, symbol: &str, query: &CandleQuery) -> Option<&Candle> {
        query.select(self.series(symbol)?).pop()
    }

    /// Returns the number of candles matching `query`.
    #[must_use]
    pub fn count(&self, symbol: &str, query: &CandleQuery) -> usize {
        self.series(symbol).map_or(0, |series| query.select(series).len())
    }

    /// Returns the number of materialized candles for `symbol`.
    #[must_use]
    pub fn materialized_count(&self, symbol: &str) -> usize {
        self.series(symbol)
            .map_or(0, |series| series.values().filter(|c| c.is_materialized()).count())
    }

    /// Computes price statistics over the candles matching `query`.
    #[must_use]
    pub fn statistics(&self, symbol: &str, query: &CandleQuery) -> Option<PriceStatistics> {
        let series = self.series(symbol)?;
        let candles = query.select(series);
        let first = candles.first()?;
        let last = candles.last()?;

        let mut min_low = f64::INFINITY;
        let mut max_high = f64::NEG_INFINITY;
        let mut typical_sum = 0.0;
        let mut total_volume = 0.0;
        for candle in &candles {
            min_low = min_low.min(candle.low);
            max_high = max_high.max(candle.high);
            typical_sum += candle.typical_price();
            total_volume += candle.volume;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_typical_price = typical_sum / candles.len() as f64;
        let change_percent = (first.close != 0.0)
            .then(|| (last.close - first.close) / first.close * 100.0);

        Some(PriceStatistics {
            candle_count: candles.len(),
            min_low,
            max_high,
            mean_typical_price,
            first_close: first.close,
            last_close: last.close,
            total_volume,
            change_percent,
        })
    }

    /// Answers whether at least `required` materialized candles exist for
    /// `symbol`.
    #[must_use]
    pub fn readiness(&self, symbol: &str, required: usize) -> Readiness {
        let count = self.materialized_count(symbol);
        let retired = self.retired(symbol);
        let ready = count >= required;
        let state = if ready {
            ReadinessState::Ready
        } else if retired > 0
            && u64::try_from(count).unwrap_or(u64::MAX).saturating_add(retired)
                >= u64::try_from(required).unwrap_or(u64::MAX)
        {
            ReadinessState::ReducedByRetention
        } else {
            ReadinessState::Insufficient
        };
        Readiness {
            state,
            ready,
            count,
            required,
            retired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CandleStore;
    use approx::assert_relative_eq;
    use candlewick_aggregate::CandleState;
    use candlewick_types::Timeframe;
    use chrono::{TimeDelta, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn candle(minute: i64, close: f64, state: CandleState) -> Candle {
        Candle {
            bucket_start: at(minute),
            symbol: "BTC".to_string(),
            timeframe: Timeframe::Minute1,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 10.0,
            vwap: Some(close),
            tick_count: 3,
            state,
        }
    }

    fn store_with(candles: Vec<Candle>) -> CandleStore {
        let store = CandleStore::new();
        store.commit(Timeframe::Minute1, candles, at(0)).unwrap();
        store
    }

    fn series(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|m| candle(m, 100.0 + m as f64, CandleState::Materialized))
            .collect()
    }

    #[test]
    fn test_candles_inclusive_bounds() {
        let store = store_with(series(10));
        let snapshot = store.snapshot(Timeframe::Minute1);
        let query = CandleQuery::new().between(Some(at(2)), Some(at(5)));
        let candles = snapshot.candles("BTC", &query);
        assert_eq!(candles.len(), 4);
        assert_eq!(candles[0].bucket_start, at(2));
        assert_eq!(candles[3].bucket_start, at(5));
    }

    #[test]
    fn test_candles_limit_keeps_most_recent_ascending() {
        let store = store_with(series(10));
        let snapshot = store.snapshot(Timeframe::Minute1);
        let candles = snapshot.candles("btc", &CandleQuery::new().with_limit(3));
        let starts: Vec<_> = candles.iter().map(|c| c.bucket_start).collect();
        assert_eq!(starts, vec![at(7), at(8), at(9)]);
    }

    #[test]
    fn test_inverted_or_unknown_ranges_are_empty() {
        let store = store_with(series(3));
        let snapshot = store.snapshot(Timeframe::Minute1);
        let inverted = CandleQuery::new().between(Some(at(2)), Some(at(1)));
        assert!(snapshot.candles("BTC", &inverted).is_empty());
        assert!(snapshot.candles("ETH", &CandleQuery::new()).is_empty());
        assert_eq!(snapshot.count("ETH", &CandleQuery::new()), 0);
    }

    #[test]
    fn test_latest_and_count() {
        let mut candles = series(4);
        candles.push(candle(4, 50.0, CandleState::Pending));
        let store = store_with(candles);
        let snapshot = store.snapshot(Timeframe::Minute1);
        let pending = CandleQuery::new().including_pending();
        assert_eq!(snapshot.latest("BTC", &pending).map(|c| c.state), Some(CandleState::Pending));
        assert_eq!(snapshot.latest("BTC", &CandleQuery::new()).map(|c| c.bucket_start), Some(at(3)));
        assert_eq!(snapshot.count("BTC", &pending), 5);
        assert_eq!(snapshot.count("BTC", &CandleQuery::new()), 4);
    }

    #[test]
    fn test_pending_candles_are_hidden_by_default() {
        let store = store_with(vec![candle(0, 100.0, CandleState::Pending)]);
        let snapshot = store.snapshot(Timeframe::Minute1);
        assert_eq!(snapshot.readiness("BTC", 1).count, 0);
        assert!(snapshot.candles("BTC", &CandleQuery::new()).is_empty());
        assert!(snapshot.statistics("BTC", &CandleQuery::new()).is_none());

        let pending = snapshot.candles("BTC", &CandleQuery::new().including_pending());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].state, CandleState::Pending);
    }

    #[test]
    fn test_statistics() {
        let store = store_with(vec![
            candle(0, 100.0, CandleState::Materialized),
            candle(1, 110.0, CandleState::Materialized),
        ]);
        let snapshot = store.snapshot(Timeframe::Minute1);
        let stats = snapshot.statistics("BTC", &CandleQuery::new()).unwrap();
        assert_eq!(stats.candle_count, 2);
        assert_eq!(stats.min_low, 98.0);
        assert_eq!(stats.max_high, 111.0);
        assert_relative_eq!(stats.total_volume, 20.0);
        assert_relative_eq!(stats.change_percent.unwrap(), 10.0, epsilon = 1e-9);
        let typical = ((101.0 + 98.0 + 100.0) / 3.0 + (111.0 + 108.0 + 110.0) / 3.0) / 2.0;
        assert_relative_eq!(stats.mean_typical_price, typical, epsilon = 1e-9);
        assert!(snapshot.statistics("ETH", &CandleQuery::new()).is_none());
    }

    #[test]
    fn test_readiness_counts_materialized_only() {
        let mut candles = series(3);
        candles.push(candle(3, 1.0, CandleState::Pending));
        let store = store_with(candles);
        let snapshot = store.snapshot(Timeframe::Minute1);

        let readiness = snapshot.readiness("BTC", 4);
        assert_eq!(readiness.count, 3);
        assert!(!readiness.ready);
        assert_eq!(readiness.state, ReadinessState::Insufficient);

        let readiness = snapshot.readiness("BTC", 3);
        assert!(readiness.ready);
        assert_eq!(readiness.state, ReadinessState::Ready);
    }

    #[test]
    fn test_readiness_flags_retention_loss() {
        let store = store_with(series(10));
        store.retire_before(Timeframe::Minute1, at(6)).unwrap();
        let snapshot = store.snapshot(Timeframe::Minute1);

        let readiness = snapshot.readiness("BTC", 8);
        assert_eq!(readiness.count, 4);
        assert_eq!(readiness.retired, 6);
        assert_eq!(readiness.state, ReadinessState::ReducedByRetention);

        let readiness = snapshot.readiness("BTC", 20);
        assert_eq!(readiness.state, ReadinessState::Insufficient);
    }
}
