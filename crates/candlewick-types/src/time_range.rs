//! Half-open time ranges and bucket iteration.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Timeframe, TimeRangeError, align_up};

/// A half-open interval of instants, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start instant (inclusive).
    pub start: DateTime<Utc>,
    /// End instant (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if start > end {
            return Err(TimeRangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range covering whole UTC days, `start` through `end` inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeRangeError> {
        let start_dt = start.and_time(NaiveTime::MIN).and_utc();
        let end_dt = end.and_time(NaiveTime::MIN).and_utc() + TimeDelta::days(1);
        Self::new(start_dt, end_dt)
    }

    /// Returns true if the range contains no instants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the length of the range.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns true if `timestamp` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Returns an iterator over the aligned bucket starts inside the range.
    pub fn buckets(&self, timeframe: Timeframe) -> BucketIterator {
        BucketIterator {
            current: align_up(self.start, timeframe),
            end: self.end,
            step: timeframe.duration(),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Iterator over aligned bucket starts in a [`TimeRange`].
#[derive(Debug, Clone)]
pub struct BucketIterator {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    step: TimeDelta,
}

impl Iterator for BucketIterator {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let result = self.current;
        self.current += self.step;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.current >= self.end {
            return (0, Some(0));
        }
        let span = (self.end - self.current).num_milliseconds();
        let step = self.step.num_milliseconds();
        let n = usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl ExactSizeIterator for BucketIterator {}
