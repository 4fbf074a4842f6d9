//! Append-only tick storage.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use candlewick_types::{Tick, TimeRange};
use chrono::{DateTime, Utc};

use crate::StoreError;

/// Source of raw ticks for refresh passes.
///
/// Implementations must return a consistent snapshot: every tick appended
/// before the call started and none half-written.
pub trait TickStore: Send + Sync {
    /// Appends an admitted tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot accept writes.
    fn append(&self, tick: Tick) -> Result<(), StoreError>;

    /// Returns every stored tick with a timestamp in `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read_range(&self, range: &TimeRange) -> Result<Vec<Tick>, StoreError>;
}

impl<T: TickStore + ?Sized> TickStore for Arc<T> {
    fn append(&self, tick: Tick) -> Result<(), StoreError> {
        (**self).append(tick)
    }

    fn read_range(&self, range: &TimeRange) -> Result<Vec<Tick>, StoreError> {
        (**self).read_range(range)
    }
}

#[derive(Debug, Default)]
struct TickLog {
    // (timestamp, arrival sequence) keeps equal-timestamp ticks distinct
    ticks: BTreeMap<(DateTime<Utc>, u64), Tick>,
    next_seq: u64,
}

/// In-memory append-only tick store.
///
/// Appends take the write lock for a single insert, reads copy their range
/// under the read lock, so neither side blocks the other for long.
#[derive(Debug, Default)]
pub struct MemoryTickStore {
    log: RwLock<TickLog>,
}

impl MemoryTickStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of ticks under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn append_batch(&self, ticks: impl IntoIterator<Item = Tick>) -> Result<usize, StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned("tick store"))?;
        let mut appended = 0;
        for tick in ticks {
            let seq = log.next_seq;
            log.next_seq += 1;
            log.ticks.insert((tick.timestamp, seq), tick);
            appended += 1;
        }
        Ok(appended)
    }

    /// Removes every tick strictly before `cutoff`, returning how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn retire_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned("tick store"))?;
        let kept = log.ticks.split_off(&(cutoff, 0));
        let removed = log.ticks.len();
        log.ticks = kept;
        if removed > 0 {
            tracing::info!(removed, %cutoff, "retired ticks");
        }
        Ok(removed)
    }

    /// Returns the number of stored ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().map_or(0, |log| log.ticks.len())
    }

    /// Returns true if the store holds no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the timestamps of the earliest and latest stored ticks.
    #[must_use]
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let log = self.log.read().ok()?;
        let first = log.ticks.keys().next()?.0;
        let last = log.ticks.keys().next_back()?.0;
        Some((first, last))
    }
}

impl TickStore for MemoryTickStore {
    fn append(&self, tick: Tick) -> Result<(), StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned("tick store"))?;
        let seq = log.next_seq;
        log.next_seq += 1;
        log.ticks.insert((tick.timestamp, seq), tick);
        Ok(())
    }

    fn read_range(&self, range: &TimeRange) -> Result<Vec<Tick>, StoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let log = self.log.read().map_err(|_| StoreError::Poisoned("tick store"))?;
        Ok(log
            .ticks
            .range((range.start, 0)..(range.end, 0))
            .map(|(_, tick)| tick.clone())
            .collect())
    }
}
