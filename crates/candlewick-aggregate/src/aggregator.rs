//! Batch tick-to-candle aggregation.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use candlewick_types::{BucketKey, Tick, Timeframe, bucket_start};
use chrono::{DateTime, Utc};

use crate::{AggregateError, Candle, CandleBuilder, CandleState};

/// Folds an unordered batch of ticks into per-bucket builders for one
/// timeframe.
///
/// Ticks may arrive in any order and for any number of symbols. Two
/// aggregators over the same timeframe can be merged.
#[derive(Debug, Clone)]
pub struct TickAggregator {
    timeframe: Timeframe,
    builders: BTreeMap<(String, DateTime<Utc>), CandleBuilder>,
}

impl TickAggregator {
    /// Creates a new aggregator for the given timeframe.
    #[must_use]
    pub const fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            builders: BTreeMap::new(),
        }
    }

    /// Returns the timeframe being aggregated to.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the number of distinct bucket keys seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Returns true if no tick has been processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Folds a tick into the builder for its bucket.
    pub fn process(&mut self, tick: &Tick) {
        let start = bucket_start(tick.timestamp, self.timeframe);
        match self.builders.entry((tick.symbol.clone(), start)) {
            Entry::Occupied(mut slot) => {
                // key matches by construction
                let _ = slot.get_mut().push(tick);
            }
            Entry::Vacant(slot) => {
                slot.insert(CandleBuilder::from_tick(self.timeframe, tick));
            }
        }
    }

    /// Merges another aggregator into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregators have different timeframes.
    pub fn merge(&mut self, other: Self) -> Result<(), AggregateError> {
        if other.timeframe != self.timeframe {
            return Err(AggregateError::TimeframeMismatch {
                expected: self.timeframe,
                found: other.timeframe,
            });
        }
        for (key, builder) in other.builders {
            match self.builders.entry(key) {
                Entry::Occupied(mut slot) => slot.get_mut().merge(&builder)?,
                Entry::Vacant(slot) => {
                    slot.insert(builder);
                }
            }
        }
        Ok(())
    }

    /// Returns the builder for a bucket key, if any tick fell into it.
    #[must_use]
    pub fn get(&self, key: &BucketKey) -> Option<&CandleBuilder> {
        if key.timeframe != self.timeframe {
            return None;
        }
        self.builders
            .get(&(key.symbol.clone(), key.bucket_start))
    }

    /// Finishes aggregation, returning one candle per bucket key, ordered
    /// by symbol then bucket start.
    pub fn finish(self, state_of: impl Fn(&BucketKey) -> CandleState) -> Vec<Candle> {
        self.builders
            .into_values()
            .map(|builder| builder.finish(state_of(builder.key())))
            .collect()
    }
}

impl Extend<Tick> for TickAggregator {
    fn extend<I: IntoIterator<Item = Tick>>(&mut self, iter: I) {
        for tick in iter {
            self.process(&tick);
        }
    }
}

impl<'a> Extend<&'a Tick> for TickAggregator {
    fn extend<I: IntoIterator<Item = &'a Tick>>(&mut self, iter: I) {
        for tick in iter {
            self.process(tick);
        }
    }
}
