//! Error types for candle aggregation.

use candlewick_types::{BucketKey, Timeframe};
use thiserror::Error;

/// Errors combining ticks or partial aggregates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// A tick or builder belongs to a different bucket key.
    #[error("bucket key mismatch: expected {expected}, found {found}")]
    KeyMismatch {
        /// Key of the receiving builder.
        expected: BucketKey,
        /// Key of the offending input.
        found: BucketKey,
    },

    /// Aggregators over different timeframes cannot be merged.
    #[error("timeframe mismatch: expected {expected}, found {found}")]
    TimeframeMismatch {
        /// Timeframe of the receiving aggregator.
        expected: Timeframe,
        /// Timeframe of the other aggregator.
        found: Timeframe,
    },
}
