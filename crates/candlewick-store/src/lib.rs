//! Tick and candle storage for the candlewick candle engine.
//!
//! - [`TickStore`] / [`MemoryTickStore`] - append-only raw tick corpus
//! - [`CandleStore`] - one atomically swapped [`CandleSnapshot`] per timeframe
//! - [`CandleQuery`], [`Readiness`], [`PriceStatistics`] - the read interface
//! - [`CandleArchive`] - JSON persistence of the candle store

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod archive;
mod candle_store;
mod error;
mod query;
mod tick_store;

pub use archive::CandleArchive;
pub use candle_store::{CandleSnapshot, CandleStore, CommitSummary, RetentionSummary, SymbolSeries};
pub use error::{ArchiveError, StoreError};
pub use query::{CandleQuery, PriceStatistics, Readiness, ReadinessState};
pub use tick_store::{MemoryTickStore, TickStore};
