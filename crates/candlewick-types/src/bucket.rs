//! Timeframe-aligned bucketing.
//!
//! A bucket is identified by its start instant, which is always an integer
//! multiple of the timeframe duration on the Unix epoch millisecond axis.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Timeframe;

/// Returns the start of the bucket containing `timestamp`.
///
/// Computed as `floor(ms / duration) * duration` on epoch milliseconds, so
/// boundaries never drift regardless of calendar effects.
#[must_use]
pub fn bucket_start(timestamp: DateTime<Utc>, timeframe: Timeframe) -> DateTime<Utc> {
    let offset = timestamp.timestamp_millis().rem_euclid(timeframe.milliseconds());
    // timestamp_millis() already floors, drop the sub-millisecond remainder too
    let sub_milli = i64::from(timestamp.timestamp_subsec_nanos() % 1_000_000);
    timestamp - TimeDelta::milliseconds(offset) - TimeDelta::nanoseconds(sub_milli)
}

/// Returns the exclusive end of the bucket containing `timestamp`.
#[must_use]
pub fn bucket_end(timestamp: DateTime<Utc>, timeframe: Timeframe) -> DateTime<Utc> {
    bucket_start(timestamp, timeframe) + timeframe.duration()
}

/// Returns the smallest bucket start that is `>= timestamp`.
#[must_use]
pub fn align_up(timestamp: DateTime<Utc>, timeframe: Timeframe) -> DateTime<Utc> {
    let start = bucket_start(timestamp, timeframe);
    if start == timestamp {
        start
    } else {
        start + timeframe.duration()
    }
}

/// Returns true if `timestamp` sits exactly on a bucket boundary.
#[must_use]
pub fn is_aligned(timestamp: DateTime<Utc>, timeframe: Timeframe) -> bool {
    bucket_start(timestamp, timeframe) == timestamp
}

/// Unique identity of one candle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    /// Trading symbol.
    pub symbol: String,
    /// Candle resolution.
    pub timeframe: Timeframe,
    /// Aligned bucket start.
    pub bucket_start: DateTime<Utc>,
}

impl BucketKey {
    /// Builds the key for a tick observed at `timestamp`.
    #[must_use]
    pub fn for_timestamp(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bucket_start: bucket_start(timestamp, timeframe),
        }
    }

    /// Returns the exclusive end of the bucket.
    #[must_use]
    pub fn bucket_end(&self) -> DateTime<Utc> {
        self.bucket_start + self.timeframe.duration()
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.symbol,
            self.timeframe,
            self.bucket_start.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}
