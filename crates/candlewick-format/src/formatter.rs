//! Format identifiers, errors and the candle writer trait.

use std::io::Write;
use std::path::Path;

use candlewick_aggregate::Candle;
use thiserror::Error;

/// Candle export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// CSV with a header row.
    #[default]
    Csv,
    /// JSON array.
    Json,
    /// Newline-delimited JSON.
    Ndjson,
    /// Apache Parquet.
    Parquet,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Parquet => "parquet",
        }
    }

    /// Returns all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json, Self::Ndjson, Self::Parquet]
    }

    /// Returns true for formats that need a seekable binary sink.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Parquet)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Tick import format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputFormat {
    /// `symbol,timestamp,price,volume` rows; the header is optional.
    Csv,
    /// One JSON tick object per line.
    #[default]
    Ndjson,
}

impl InputFormat {
    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Ndjson => "ndjson",
        })
    }
}

impl std::str::FromStr for InputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ndjson" | "jsonl" | "json" => Ok(Self::Ndjson),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Errors that can occur while writing candles or reading ticks.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Unknown format name.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Format compiled out of this build.
    #[error("{0} support is not enabled in this build")]
    Disabled(&'static str),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/Parquet error.
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// A tick row could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the row.
        message: String,
    },
}

/// Writes candles in one output format.
pub trait CandleWriter: Send + Sync {
    /// Writes `candles` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn write_candles<W: Write + Send>(&self, candles: &[Candle], writer: W) -> Result<(), FormatError>;

    /// Returns the file extension for this format.
    fn extension(&self) -> &str;
}

/// Writes candles with the default writer of `format`.
///
/// # Errors
///
/// Returns an error if encoding or writing fails, or if `format` is
/// compiled out.
pub fn write_candles<W: Write + Send>(
    format: OutputFormat,
    candles: &[Candle],
    writer: W,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Csv => crate::CsvFormatter::new().write_candles(candles, writer),
        OutputFormat::Json => crate::JsonFormatter::new().write_candles(candles, writer),
        OutputFormat::Ndjson => crate::JsonFormatter::ndjson().write_candles(candles, writer),
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet => crate::ParquetFormatter::new().write_candles(candles, writer),
        #[cfg(not(feature = "parquet"))]
        OutputFormat::Parquet => Err(FormatError::Disabled("parquet")),
    }
}
