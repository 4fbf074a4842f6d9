//! Incremental materialization for the candlewick candle engine.
//!
//! - [`CandleEngine`] - Ingestion, refresh passes and candle reads
//! - [`RefreshPolicy`] and [`RefreshWindow`] - Per-timeframe recomputation bounds
//! - [`RefreshScheduler`] - Recurring refresh tasks on the tokio runtime
//! - [`RefreshRun`] and [`RunHistory`] - Records of completed, failed and skipped passes
//! - [`EngineConfig`] - TOML configuration

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod engine;
mod error;
mod policy;
mod run;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_RUN_HISTORY, EngineConfig};
pub use engine::{CandleEngine, IngestOutcome, IngestSummary};
pub use error::{ConfigError, IngestError, PolicyError, RefreshError, SchedulerError};
pub use policy::{
    MAX_OFFSET, PolicySummary, RefreshPolicy, RefreshWindow, format_duration, parse_duration,
};
pub use run::{RefreshRun, RunHistory, RunId, RunStatus, RunTrigger};
pub use scheduler::{RefreshScheduler, TaskState, TaskStatus};
