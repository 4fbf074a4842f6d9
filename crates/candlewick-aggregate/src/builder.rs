//! Order-invariant candle builder.

use candlewick_types::{BucketKey, Tick, Timeframe};
use chrono::{DateTime, Utc};

use crate::{AggregateError, Candle, CandleState, ExactSum};

/// A price stamped with the instant it was observed.
///
/// Ordered by `(timestamp, price)` with IEEE total ordering on the price, so
/// equal timestamps resolve deterministically.
#[derive(Debug, Clone, Copy)]
struct Stamped {
    timestamp: DateTime<Utc>,
    price: f64,
}

impl Stamped {
    fn order(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.price.total_cmp(&other.price))
    }
}

/// Accumulates ticks for one bucket key.
///
/// [`push`](Self::push) and [`merge`](Self::merge) are associative and
/// commutative: any order or partition of the same ticks finishes into the
/// same candle, bit for bit. On equal timestamps `open` takes the lowest
/// price and `close` takes the highest.
#[derive(Debug, Clone)]
pub struct CandleBuilder {
    key: BucketKey,
    first: Stamped,
    last: Stamped,
    high: f64,
    low: f64,
    volume: ExactSum,
    notional: ExactSum,
    tick_count: u64,
}

impl CandleBuilder {
    /// Starts a builder from the first tick of a bucket.
    #[must_use]
    pub fn from_tick(timeframe: Timeframe, tick: &Tick) -> Self {
        let stamped = Stamped {
            timestamp: tick.timestamp,
            price: tick.price,
        };
        let mut volume = ExactSum::new();
        volume.add(tick.volume);
        let mut notional = ExactSum::new();
        notional.add(tick.notional());
        Self {
            key: BucketKey::for_timestamp(tick.symbol.clone(), timeframe, tick.timestamp),
            first: stamped,
            last: stamped,
            high: tick.price,
            low: tick.price,
            volume,
            notional,
            tick_count: 1,
        }
    }

    /// Returns the bucket key being built.
    #[must_use]
    pub const fn key(&self) -> &BucketKey {
        &self.key
    }

    /// Returns the number of ticks folded in so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Folds a tick into the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick belongs to a different bucket key.
    pub fn push(&mut self, tick: &Tick) -> Result<(), AggregateError> {
        let key = BucketKey::for_timestamp(tick.symbol.as_str(), self.key.timeframe, tick.timestamp);
        if key != self.key {
            return Err(AggregateError::KeyMismatch {
                expected: self.key.clone(),
                found: key,
            });
        }
        self.fold(
            Stamped {
                timestamp: tick.timestamp,
                price: tick.price,
            },
            tick.price,
            tick.price,
        );
        self.volume.add(tick.volume);
        self.notional.add(tick.notional());
        self.tick_count += 1;
        Ok(())
    }

    /// Folds another builder for the same key into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the builders have different keys.
    pub fn merge(&mut self, other: &Self) -> Result<(), AggregateError> {
        if other.key != self.key {
            return Err(AggregateError::KeyMismatch {
                expected: self.key.clone(),
                found: other.key.clone(),
            });
        }
        self.fold(other.first, other.high, other.low);
        self.fold(other.last, other.high, other.low);
        self.volume.merge(&other.volume);
        self.notional.merge(&other.notional);
        self.tick_count += other.tick_count;
        Ok(())
    }

    fn fold(&mut self, stamped: Stamped, high: f64, low: f64) {
        if stamped.order(&self.first).is_lt() {
            self.first = stamped;
        }
        if stamped.order(&self.last).is_gt() {
            self.last = stamped;
        }
        self.high = self.high.max(high);
        self.low = self.low.min(low);
    }

    /// Finishes building and returns the candle.
    #[must_use]
    pub fn finish(&self, state: CandleState) -> Candle {
        let volume = self.volume.value();
        let vwap = (volume > 0.0).then(|| self.notional.value() / volume);
        Candle {
            bucket_start: self.key.bucket_start,
            symbol: self.key.symbol.clone(),
            timeframe: self.key.timeframe,
            open: self.first.price,
            high: self.high,
            low: self.low,
            close: self.last.price,
            volume,
            vwap,
            tick_count: self.tick_count,
            state,
        }
    }
}
