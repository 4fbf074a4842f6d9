//! Multi-resolution candle store with atomic snapshot replacement.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use candlewick_aggregate::{Candle, CandleState};
use candlewick_types::Timeframe;
use chrono::{DateTime, Utc};

use crate::StoreError;

/// Candles of one symbol at one timeframe, keyed by bucket start.
pub type SymbolSeries = BTreeMap<DateTime<Utc>, Candle>;

/// Immutable view of every candle of one timeframe.
///
/// Readers hold an `Arc` to a snapshot and never observe a commit in
/// progress. Per-symbol series are shared between consecutive snapshots
/// until a commit touches them.
#[derive(Debug, Clone)]
pub struct CandleSnapshot {
    pub(crate) timeframe: Timeframe,
    pub(crate) version: u64,
    pub(crate) watermark: Option<DateTime<Utc>>,
    pub(crate) retained_from: Option<DateTime<Utc>>,
    pub(crate) series: HashMap<String, Arc<SymbolSeries>>,
    pub(crate) retired: HashMap<String, u64>,
}

impl CandleSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            version: 0,
            watermark: None,
            retained_from: None,
            series: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    /// Returns the timeframe of the snapshot.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the commit counter, incremented by every commit and retention.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the latest finality boundary committed.
    #[must_use]
    pub const fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Returns the earliest bucket start kept after retention.
    #[must_use]
    pub const fn retained_from(&self) -> Option<DateTime<Utc>> {
        self.retained_from
    }

    /// Returns the series for `symbol`, exact spelling first, then upper-cased.
    #[must_use]
    pub fn series(&self, symbol: &str) -> Option<&SymbolSeries> {
        self.series
            .get(symbol)
            .or_else(|| self.series.get(&symbol.to_uppercase()))
            .map(AsRef::as_ref)
    }

    /// Returns the symbols with at least one candle, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .series
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(symbol, _)| symbol.as_str())
            .collect();
        symbols.sort_unstable();
        symbols
    }

    /// Returns the number of materialized candles removed by retention for
    /// `symbol`.
    #[must_use]
    pub fn retired(&self, symbol: &str) -> u64 {
        self.retired
            .get(symbol)
            .or_else(|| self.retired.get(&symbol.to_uppercase()))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total number of candles across symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }

    /// Returns true if the snapshot holds no candles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every candle, by symbol then bucket start within a symbol.
    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.series.values().flat_map(|s| s.values())
    }
}

/// Result of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Version of the snapshot now visible.
    pub version: u64,
    /// Candles written.
    pub written: usize,
    /// Candles dropped because their bucket precedes the retention cutoff.
    pub dropped: usize,
    /// Pending candles outside the pass that became final under the new watermark.
    pub promoted: usize,
    /// Watermark after the commit.
    pub watermark: Option<DateTime<Utc>>,
}

/// Result of a retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionSummary {
    /// Candles removed.
    pub removed: usize,
    /// Of those, how many were materialized.
    pub removed_materialized: usize,
}

/// Marks pending candles whose bucket ended at or before `watermark` as
/// materialized. Pending candles always form the tail of a series.
fn promote_settled(snapshot: &mut CandleSnapshot, watermark: DateTime<Utc>) -> usize {
    let mut promoted = 0;
    for series in snapshot.series.values_mut() {
        let settled = series
            .values()
            .rev()
            .take_while(|c| !c.is_materialized())
            .any(|c| c.bucket_end() <= watermark);
        if !settled {
            continue;
        }
        for candle in Arc::make_mut(series).values_mut().rev() {
            if candle.is_materialized() {
                break;
            }
            if candle.bucket_end() <= watermark {
                candle.state = CandleState::Materialized;
                promoted += 1;
            }
        }
    }
    promoted
}

#[derive(Debug)]
struct Slot {
    current: RwLock<Arc<CandleSnapshot>>,
    writer: Mutex<()>,
}

impl Slot {
    fn new(timeframe: Timeframe) -> Self {
        Self {
            current: RwLock::new(Arc::new(CandleSnapshot::empty(timeframe))),
            writer: Mutex::new(()),
        }
    }

    fn load(&self) -> Arc<CandleSnapshot> {
        // a poisoned guard still holds a complete snapshot: swaps are single stores
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn store(&self, next: CandleSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}

/// One durable candle per `(symbol, timeframe, bucket_start)`.
///
/// Each timeframe owns an independent slot. Commits to a slot are
/// serialized and publish a whole new snapshot in one pointer swap.
#[derive(Debug)]
pub struct CandleStore {
    slots: Vec<Slot>,
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleStore {
    /// Creates an empty store with a slot for every timeframe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Timeframe::all().iter().map(|tf| Slot::new(*tf)).collect(),
        }
    }

    fn slot(&self, timeframe: Timeframe) -> &Slot {
        // Timeframe::all() lists variants in declaration order
        &self.slots[timeframe as usize]
    }

    /// Returns the current snapshot of a timeframe.
    #[must_use]
    pub fn snapshot(&self, timeframe: Timeframe) -> Arc<CandleSnapshot> {
        self.slot(timeframe).load()
    }

    /// Replaces the given candles and advances the watermark.
    ///
    /// A candle already materialized stays materialized, and pending candles
    /// whose bucket ended at or before the new watermark become materialized.
    /// Candles whose bucket precedes the retention cutoff are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer lock is poisoned or a candle belongs to
    /// another timeframe. Nothing is published in that case.
    pub fn commit(
        &self,
        timeframe: Timeframe,
        candles: impl IntoIterator<Item = Candle>,
        watermark: DateTime<Utc>,
    ) -> Result<CommitSummary, StoreError> {
        let slot = self.slot(timeframe);
        let _writer = slot
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("candle writer"))?;

        let mut next = (*slot.load()).clone();
        let mut written = 0;
        let mut dropped = 0;
        for mut candle in candles {
            if candle.timeframe != timeframe {
                return Err(StoreError::TimeframeMismatch {
                    expected: timeframe,
                    found: candle.timeframe,
                });
            }
            if next.retained_from.is_some_and(|cutoff| candle.bucket_start < cutoff) {
                dropped += 1;
                continue;
            }
            let series = Arc::make_mut(next.series.entry(candle.symbol.clone()).or_default());
            if series
                .get(&candle.bucket_start)
                .is_some_and(Candle::is_materialized)
            {
                candle.state = CandleState::Materialized;
            }
            series.insert(candle.bucket_start, candle);
            written += 1;
        }

        let boundary = next.watermark.map_or(watermark, |w| w.max(watermark));
        next.watermark = Some(boundary);
        let promoted = promote_settled(&mut next, boundary);
        next.version += 1;
        let summary = CommitSummary {
            version: next.version,
            written,
            dropped,
            promoted,
            watermark: next.watermark,
        };
        slot.store(next);
        Ok(summary)
    }

    /// Removes every candle whose bucket starts before `cutoff`.
    ///
    /// Removed materialized candles are tallied per symbol so readiness can
    /// tell a retention loss apart from missing history. Later commits never
    /// re-create candles before the cutoff.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer lock is poisoned.
    pub fn retire_before(
        &self,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> Result<RetentionSummary, StoreError> {
        let slot = self.slot(timeframe);
        let _writer = slot
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("candle writer"))?;

        let mut next = (*slot.load()).clone();
        let mut summary = RetentionSummary::default();
        for (symbol, series) in &mut next.series {
            if series.first_key_value().is_none_or(|(start, _)| *start >= cutoff) {
                continue;
            }
            let series = Arc::make_mut(series);
            let kept = series.split_off(&cutoff);
            let materialized = series.values().filter(|c| c.is_materialized()).count();
            summary.removed += series.len();
            summary.removed_materialized += materialized;
            *series = kept;
            if materialized > 0 {
                *next.retired.entry(symbol.clone()).or_insert(0) += materialized as u64;
            }
        }
        next.series.retain(|_, series| !series.is_empty());
        next.retained_from = next.retained_from.max(Some(cutoff));
        next.version += 1;
        slot.store(next);

        tracing::info!(
            %timeframe,
            %cutoff,
            removed = summary.removed,
            "applied candle retention"
        );
        Ok(summary)
    }

    /// Replaces a timeframe's snapshot wholesale, e.g. after loading an
    /// archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer lock is poisoned or the snapshot
    /// belongs to another timeframe.
    pub fn restore(&self, snapshot: CandleSnapshot) -> Result<(), StoreError> {
        let slot = self.slot(snapshot.timeframe);
        let _writer = slot
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("candle writer"))?;
        if let Some(candle) = snapshot.iter().find(|c| c.timeframe != snapshot.timeframe) {
            return Err(StoreError::TimeframeMismatch {
                expected: snapshot.timeframe,
                found: candle.timeframe,
            });
        }
        slot.store(snapshot);
        Ok(())
    }
}
