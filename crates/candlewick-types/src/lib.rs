//! Core types for the candlewick candle aggregation engine.
//!
//! This crate provides the fundamental data structures used throughout candlewick:
//!
//! - [`Tick`] - A single price/volume observation for one symbol
//! - [`Timeframe`] - Candle resolution
//! - [`bucket_start`] and [`BucketKey`] - Timeframe-aligned bucketing
//! - [`TimeRange`] - Half-open time range with bucket iteration

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bucket;
mod error;
mod tick;
mod time_range;
mod timeframe;

pub use bucket::{BucketKey, align_up, bucket_end, bucket_start, is_aligned};
pub use error::{TickError, TimeRangeError};
pub use tick::Tick;
pub use time_range::{BucketIterator, TimeRange};
pub use timeframe::{Timeframe, TimeframeParseError};
