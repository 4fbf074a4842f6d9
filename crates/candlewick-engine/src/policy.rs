//! Per-timeframe refresh policies and window computation.

use candlewick_types::{TimeRange, Timeframe, align_up, bucket_start};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::PolicyError;

/// Largest accepted offset or interval, roughly one hundred years.
pub const MAX_OFFSET: TimeDelta = TimeDelta::days(36_500);

/// Returns `now - offset`, clamped to the Unix epoch.
///
/// Ticks never precede the epoch, so a clamped bound covers the same ticks.
fn earlier(now: DateTime<Utc>, offset: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(offset)
        .map_or(DateTime::UNIX_EPOCH, |t| t.max(DateTime::UNIX_EPOCH))
}

/// Parses a duration such as `"90s"`, `"15m"`, `"6h"`, `"7d"` or `"2w"`.
///
/// # Errors
///
/// Returns an error if the quantity is not a non-negative integer or the
/// unit suffix is unknown.
pub fn parse_duration(s: &str) -> Result<TimeDelta, PolicyError> {
    let s = s.trim();
    let invalid = || PolicyError::InvalidDuration(s.to_string());
    if s.len() < 2 {
        return Err(invalid());
    }
    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: i64 = num_str.parse().map_err(|_| invalid())?;
    if n < 0 {
        return Err(invalid());
    }
    let unit_secs = match suffix {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 7 * 86_400,
        _ => return Err(invalid()),
    };
    n.checked_mul(unit_secs)
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(invalid)
}

/// Formats a duration with the largest unit that divides it exactly.
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds();
    for (unit, suffix) in [(7 * 86_400, "w"), (86_400, "d"), (3_600, "h"), (60, "m")] {
        if secs != 0 && secs % unit == 0 {
            return format!("{}{suffix}", secs / unit);
        }
    }
    format!("{secs}s")
}

/// How far back, how late and how often one timeframe is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    start_offset: TimeDelta,
    end_offset: TimeDelta,
    schedule_interval: TimeDelta,
}

impl RefreshPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 <= end_offset < start_offset`,
    /// `schedule_interval > 0` and neither `start_offset` nor
    /// `schedule_interval` exceeds [`MAX_OFFSET`].
    pub fn new(
        start_offset: TimeDelta,
        end_offset: TimeDelta,
        schedule_interval: TimeDelta,
    ) -> Result<Self, PolicyError> {
        if start_offset < TimeDelta::zero() || end_offset < TimeDelta::zero() {
            return Err(PolicyError::NegativeOffset);
        }
        if end_offset >= start_offset {
            return Err(PolicyError::EndNotBeforeStart {
                start: format_duration(start_offset),
                end: format_duration(end_offset),
            });
        }
        if schedule_interval <= TimeDelta::zero() {
            return Err(PolicyError::ZeroInterval);
        }
        for value in [start_offset, schedule_interval] {
            if value > MAX_OFFSET {
                return Err(PolicyError::TooLarge(format_duration(value)));
            }
        }
        Ok(Self {
            start_offset,
            end_offset,
            schedule_interval,
        })
    }

    /// Returns the default policy for a timeframe.
    #[must_use]
    pub fn default_for(timeframe: Timeframe) -> Self {
        let start_offset = match timeframe {
            Timeframe::Minute1 => TimeDelta::hours(2),
            Timeframe::Minute5 => TimeDelta::hours(6),
            Timeframe::Minute15 => TimeDelta::days(1),
            Timeframe::Hour1 => TimeDelta::days(3),
            Timeframe::Hour4 => TimeDelta::days(7),
            Timeframe::Day1 => TimeDelta::days(30),
        };
        Self {
            start_offset,
            end_offset: timeframe.duration(),
            schedule_interval: timeframe.duration(),
        }
    }

    /// Returns how far back recomputation reaches.
    #[must_use]
    pub const fn start_offset(&self) -> TimeDelta {
        self.start_offset
    }

    /// Returns the safety lag excluding the most recent ticks.
    #[must_use]
    pub const fn end_offset(&self) -> TimeDelta {
        self.end_offset
    }

    /// Returns the cadence of scheduled passes.
    #[must_use]
    pub const fn schedule_interval(&self) -> TimeDelta {
        self.schedule_interval
    }

    /// Returns the finality boundary at `now`.
    #[must_use]
    pub fn finality(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        earlier(now, self.end_offset)
    }

    /// Returns the earliest tick instant the window at `now` can reach.
    #[must_use]
    pub fn lookback(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        earlier(now, self.start_offset)
    }

    /// Returns the scheduled refresh window at `now`.
    ///
    /// Covers every bucket whose start lies in
    /// `[align_up(now - start_offset), bucket_start(now - end_offset)]`.
    #[must_use]
    pub fn window(&self, timeframe: Timeframe, now: DateTime<Utc>) -> RefreshWindow {
        let first = align_up(self.lookback(now), timeframe);
        let end = bucket_start(self.finality(now), timeframe) + timeframe.duration();
        RefreshWindow::from_aligned(timeframe, first, end)
    }
}

/// Policy settings as plain strings, for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySummary {
    /// Look-back, e.g. `"6h"`.
    pub start_offset: String,
    /// Safety lag, e.g. `"5m"`.
    pub end_offset: String,
    /// Cadence, e.g. `"5m"`.
    pub schedule_interval: String,
}

impl From<&RefreshPolicy> for PolicySummary {
    fn from(policy: &RefreshPolicy) -> Self {
        Self {
            start_offset: format_duration(policy.start_offset),
            end_offset: format_duration(policy.end_offset),
            schedule_interval: format_duration(policy.schedule_interval),
        }
    }
}

/// Set of bucket starts recomputed by one pass.
///
/// `range` has both ends aligned to the timeframe; its start is the first
/// bucket start and its end is one past the last bucket. The same range
/// bounds the ticks the pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshWindow {
    timeframe: Timeframe,
    range: TimeRange,
}

impl RefreshWindow {
    fn from_aligned(timeframe: Timeframe, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let end = end.max(start);
        Self {
            timeframe,
            range: TimeRange { start, end },
        }
    }

    /// Builds the window of buckets whose start lies in `range`.
    #[must_use]
    pub fn covering(timeframe: Timeframe, range: &TimeRange) -> Self {
        Self::from_aligned(
            timeframe,
            align_up(range.start, timeframe),
            align_up(range.end, timeframe),
        )
    }

    /// Returns the timeframe.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the aligned range of bucket starts, also the tick read range.
    #[must_use]
    pub const fn range(&self) -> &TimeRange {
        &self.range
    }

    /// Returns the first bucket start, or `None` if the window is empty.
    #[must_use]
    pub fn first_bucket(&self) -> Option<DateTime<Utc>> {
        (!self.is_empty()).then_some(self.range.start)
    }

    /// Returns the last bucket start, or `None` if the window is empty.
    #[must_use]
    pub fn last_bucket(&self) -> Option<DateTime<Utc>> {
        (!self.is_empty()).then(|| self.range.end - self.timeframe.duration())
    }

    /// Returns true if no bucket is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns true if the bucket starting at `start` is covered.
    #[must_use]
    pub fn contains_bucket(&self, start: DateTime<Utc>) -> bool {
        self.range.contains(start)
    }

    /// Returns the number of buckets covered.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.range.buckets(self.timeframe).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s").unwrap(), TimeDelta::seconds(90));
        assert_eq!(parse_duration("15m").unwrap(), TimeDelta::minutes(15));
        assert_eq!(parse_duration("6h").unwrap(), TimeDelta::hours(6));
        assert_eq!(parse_duration("7d").unwrap(), TimeDelta::days(7));
        assert_eq!(parse_duration("2w").unwrap(), TimeDelta::days(14));
        assert_eq!(parse_duration("0s").unwrap(), TimeDelta::zero());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("5y").is_err());
        assert!(parse_duration("1.5h").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::hours(6)), "6h");
        assert_eq!(format_duration(TimeDelta::days(30)), "30d");
        assert_eq!(format_duration(TimeDelta::seconds(90)), "90s");
        assert_eq!(format_duration(TimeDelta::zero()), "0s");
    }

    #[test]
    fn test_policy_validation() {
        let m = TimeDelta::minutes;
        assert!(RefreshPolicy::new(m(10), m(5), m(5)).is_ok());
        assert!(matches!(
            RefreshPolicy::new(m(5), m(5), m(5)),
            Err(PolicyError::EndNotBeforeStart { .. })
        ));
        assert_eq!(
            RefreshPolicy::new(m(10), m(-1), m(5)),
            Err(PolicyError::NegativeOffset)
        );
        assert_eq!(
            RefreshPolicy::new(m(10), m(5), TimeDelta::zero()),
            Err(PolicyError::ZeroInterval)
        );
    }

    #[test]
    fn test_policy_rejects_oversized_durations() {
        let m = TimeDelta::minutes;
        assert!(matches!(
            RefreshPolicy::new(TimeDelta::days(1_000_000_000), m(5), m(5)),
            Err(PolicyError::TooLarge(_))
        ));
        assert!(matches!(
            RefreshPolicy::new(m(30), m(5), MAX_OFFSET + TimeDelta::days(1)),
            Err(PolicyError::TooLarge(_))
        ));
        assert!(RefreshPolicy::new(MAX_OFFSET, m(5), m(5)).is_ok());
    }

    #[test]
    fn test_window_clamps_to_epoch() {
        let policy = RefreshPolicy::new(MAX_OFFSET, TimeDelta::minutes(5), TimeDelta::minutes(5)).unwrap();
        let now = Utc.with_ymd_and_hms(1970, 1, 1, 0, 12, 0).unwrap();
        let window = policy.window(Timeframe::Minute5, now);
        assert_eq!(policy.lookback(now), DateTime::UNIX_EPOCH);
        assert_eq!(window.first_bucket(), Some(DateTime::UNIX_EPOCH));
        assert_eq!(window.bucket_count(), 2);

        let long_lag = RefreshPolicy::new(TimeDelta::days(2), TimeDelta::days(1), TimeDelta::minutes(5)).unwrap();
        assert_eq!(long_lag.finality(now), DateTime::UNIX_EPOCH);
        assert!(long_lag.window(Timeframe::Minute5, now).bucket_count() <= 1);
    }

    #[test]
    fn test_defaults() {
        let policy = RefreshPolicy::default_for(Timeframe::Minute5);
        assert_eq!(policy.start_offset(), TimeDelta::hours(6));
        assert_eq!(policy.end_offset(), TimeDelta::minutes(5));
        assert_eq!(policy.schedule_interval(), TimeDelta::minutes(5));
        for tf in Timeframe::all() {
            let p = RefreshPolicy::default_for(*tf);
            assert!(RefreshPolicy::new(p.start_offset(), p.end_offset(), p.schedule_interval()).is_ok());
        }
    }

    #[test]
    fn test_window_is_inclusive_and_aligned() {
        let m = TimeDelta::minutes;
        let policy = RefreshPolicy::new(m(30), m(5), m(5)).unwrap();
        let window = policy.window(Timeframe::Minute5, at(1, 2, 0));
        // now - 30m = 00:32 rounds up to 00:35, now - 5m = 00:57 rounds down to 00:55
        assert_eq!(window.first_bucket(), Some(at(0, 35, 0)));
        assert_eq!(window.last_bucket(), Some(at(0, 55, 0)));
        assert_eq!(window.bucket_count(), 5);
        assert!(window.contains_bucket(at(0, 55, 0)));
        assert!(!window.contains_bucket(at(1, 0, 0)));
    }

    #[test]
    fn test_window_on_exact_boundaries() {
        let m = TimeDelta::minutes;
        let policy = RefreshPolicy::new(m(10), m(5), m(5)).unwrap();
        let window = policy.window(Timeframe::Minute5, at(0, 20, 0));
        assert_eq!(window.first_bucket(), Some(at(0, 10, 0)));
        assert_eq!(window.last_bucket(), Some(at(0, 15, 0)));
    }

    #[test]
    fn test_window_can_be_empty() {
        let m = TimeDelta::minutes;
        let policy = RefreshPolicy::new(m(3), m(1), m(1)).unwrap();
        // now - 3m = 00:11 rounds up to 00:15, now - 1m = 00:13 rounds down to 00:10
        let window = policy.window(Timeframe::Minute5, at(0, 14, 0));
        assert!(window.is_empty());
        assert_eq!(window.first_bucket(), None);
        assert_eq!(window.bucket_count(), 0);
    }

    #[test]
    fn test_covering_manual_range() {
        let range = TimeRange::new(at(0, 2, 0), at(0, 11, 0)).unwrap();
        let window = RefreshWindow::covering(Timeframe::Minute5, &range);
        assert_eq!(window.first_bucket(), Some(at(0, 5, 0)));
        assert_eq!(window.last_bucket(), Some(at(0, 10, 0)));
    }
}
