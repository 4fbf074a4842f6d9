//! Candle aggregation for the candlewick candle engine.
//!
//! This crate provides tick-to-candle aggregation:
//!
//! - [`Candle`] - OHLCV+VWAP candle with its finality state
//! - [`CandleBuilder`] - Order-invariant accumulator for one bucket
//! - [`TickAggregator`] - Folds a tick batch into per-bucket builders
//! - [`ExactSum`] - Correctly rounded summation used for volume and notional

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod builder;
mod candle;
mod error;
mod exact_sum;

pub use aggregator::TickAggregator;
pub use builder::CandleBuilder;
pub use candle::{Candle, CandleState};
pub use error::AggregateError;
pub use exact_sum::ExactSum;
