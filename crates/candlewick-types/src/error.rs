//! Error types for candlewick core types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A tick that is not well-formed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TickError {
    /// Timestamp precedes the Unix epoch.
    #[error("timestamp {0} is before the Unix epoch")]
    BeforeEpoch(DateTime<Utc>),

    /// Price is not a finite positive number.
    #[error("price {0} is not finite and positive")]
    InvalidPrice(f64),

    /// Volume is not a finite non-negative number.
    #[error("volume {0} is not finite and non-negative")]
    InvalidVolume(f64),
}

/// Error for invalid time ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Start is after end.
    #[error("invalid time range: {start} > {end}")]
    InvalidRange {
        /// The start instant.
        start: DateTime<Utc>,
        /// The end instant.
        end: DateTime<Utc>,
    },
}
