//! Incremental multi-resolution candle aggregation.
//!
//! This is a facade crate that re-exports functionality from the candlewick
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use candlewick_lib::prelude::*;
//!
//! let engine = Arc::new(CandleEngine::new(
//!     Arc::new(PairRegistry::global().clone()),
//!     Arc::new(MemoryTickStore::new()),
//!     Arc::new(SystemClock),
//!     &EngineConfig::default(),
//! ));
//! let scheduler = RefreshScheduler::new(Arc::clone(&engine));
//! scheduler.enable_all()?;
//!
//! engine.ingest(Tick::new("BTC", chrono::Utc::now(), 42_000.0, 0.1))?;
//! let readiness = engine.readiness("BTC", Timeframe::Minute5, 20);
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candlewick_types::*;

// Re-export the catalog
pub use candlewick_catalog::{
    CatalogError, DEFAULT_TRACKED_SYMBOLS, GateStats, OTHER_SYMBOLS, Pair, PairCategory,
    PairRegistry, Rejection, SymbolCatalog, SymbolGate, SymbolStatus,
};

// Re-export aggregation
pub use candlewick_aggregate::{
    AggregateError, Candle, CandleBuilder, CandleState, ExactSum, TickAggregator,
};

// Re-export storage
pub use candlewick_store::{
    ArchiveError, CandleArchive, CandleQuery, CandleSnapshot, CandleStore, MemoryTickStore,
    PriceStatistics, Readiness, ReadinessState, StoreError, TickStore,
};

// Re-export the engine
#[cfg(feature = "engine")]
pub use candlewick_engine::{
    CandleEngine, Clock, ConfigError, EngineConfig, IngestError, IngestOutcome, IngestSummary,
    ManualClock, RefreshError, RefreshPolicy, RefreshRun, RefreshScheduler, RefreshWindow,
    RunStatus, RunTrigger, SchedulerError, SystemClock, TaskState,
};

// Re-export formats
#[cfg(feature = "format")]
pub use candlewick_format::{
    CandleWriter, CsvFormatter, FormatError, InputFormat, JsonFormatter, OutputFormat, TickReader,
    write_candles,
};

#[cfg(all(feature = "format", feature = "parquet"))]
pub use candlewick_format::ParquetFormatter;

/// Prelude module for convenient imports.
///
/// ```
/// use candlewick_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candlewick_types::{Tick, TimeRange, Timeframe, bucket_start};

    pub use candlewick_catalog::{PairRegistry, SymbolCatalog};

    pub use candlewick_aggregate::{Candle, CandleState};

    pub use candlewick_store::{CandleQuery, MemoryTickStore, Readiness, ReadinessState, TickStore};

    #[cfg(feature = "engine")]
    pub use candlewick_engine::{
        CandleEngine, EngineConfig, ManualClock, RefreshScheduler, SystemClock,
    };

    #[cfg(feature = "format")]
    pub use candlewick_format::{OutputFormat, TickReader, write_candles};
}
