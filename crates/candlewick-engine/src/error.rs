//! Error types for the refresh engine.

use std::path::PathBuf;

use candlewick_catalog::Rejection;
use candlewick_store::StoreError;
use candlewick_types::{Timeframe, TimeframeParseError};
use thiserror::Error;

/// An invalid refresh policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Duration string could not be parsed.
    #[error("invalid duration '{0}': expected a non-negative integer followed by one of s/m/h/d/w")]
    InvalidDuration(String),

    /// The safety lag must be shorter than the look-back.
    #[error("end_offset ({end}) must be smaller than start_offset ({start})")]
    EndNotBeforeStart {
        /// Configured start offset.
        start: String,
        /// Configured end offset.
        end: String,
    },

    /// Offsets cannot be negative.
    #[error("offsets must not be negative")]
    NegativeOffset,

    /// The schedule interval must be positive.
    #[error("schedule_interval must be greater than zero")]
    ZeroInterval,

    /// An offset or interval exceeds the supported range.
    #[error("duration {0} exceeds the supported maximum of 36500d")]
    TooLarge(String),
}

/// Errors loading engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `[refresh.<timeframe>]` table names an unknown timeframe.
    #[error(transparent)]
    Timeframe(#[from] TimeframeParseError),

    /// A refresh policy is invalid.
    #[error("invalid refresh policy for {timeframe}: {source}")]
    Policy {
        /// Timeframe the policy belongs to.
        timeframe: Timeframe,
        /// What is wrong with it.
        source: PolicyError,
    },

    /// `run_history` must keep at least one run.
    #[error("run_history must be at least 1")]
    EmptyHistory,
}

/// A refresh pass that failed before publishing anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Reading ticks or committing candles failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The requested window is not a valid range.
    #[error("invalid refresh window: {0}")]
    InvalidWindow(String),

    /// No refresh policy is configured for the timeframe.
    #[error("no refresh policy configured for {0}")]
    NoPolicy(Timeframe),
}

/// Why a tick was not ingested.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// The admission gate refused the tick.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The tick store refused the append.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors controlling the scheduler.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The scheduler was shut down.
    #[error("scheduler is shut down")]
    ShutDown,

    /// No refresh policy is configured for the timeframe.
    #[error("no refresh task for {0}")]
    UnknownTask(Timeframe),

    /// Not called from within a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// A manual pass failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// The blocking pass panicked or was cancelled.
    #[error("refresh task failed: {0}")]
    Join(String),
}
