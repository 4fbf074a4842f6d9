//! Error types for tick and candle storage.

use std::path::PathBuf;

use candlewick_types::Timeframe;
use thiserror::Error;

/// Errors raised by the tick or candle store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    /// A candle was committed to the wrong timeframe.
    #[error("candle for {found} committed to the {expected} store")]
    TimeframeMismatch {
        /// Timeframe of the target store slot.
        expected: Timeframe,
        /// Timeframe of the offending candle.
        found: Timeframe,
    },

    /// The backing store could not serve the request.
    #[error("tick store unavailable: {0}")]
    Unavailable(String),
}

/// Errors reading or writing the candle archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse an archive file.
    #[error("Failed to parse archive file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize a snapshot.
    #[error("Failed to serialize candles: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// Archive content does not fit the store.
    #[error(transparent)]
    Store(#[from] StoreError),
}
