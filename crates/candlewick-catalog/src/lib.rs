//! Symbol catalog for the candlewick candle engine.
//!
//! This crate provides the bundled registry of tradable perpetual pairs,
//! the [`SymbolCatalog`] seam for other sources, and the [`SymbolGate`]
//! that admits well-formed ticks for active symbols only.
//!
//! # Example
//!
//! ```
//! use candlewick_catalog::PairRegistry;
//!
//! let registry = PairRegistry::global();
//!
//! if let Some(pair) = registry.get("btc") {
//!     println!("{}: max leverage {}x", pair.symbol(), pair.max_leverage());
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod error;
mod gate;
mod pair;
mod registry;

pub use catalog::{SymbolCatalog, SymbolStatus};
pub use error::{CatalogError, Rejection};
pub use gate::{DEFAULT_TRACKED_SYMBOLS, GateStats, OTHER_SYMBOLS, SymbolGate};
pub use pair::{Pair, PairCategory};
pub use registry::PairRegistry;
