//! Candle export and tick import for the candlewick candle engine.
//!
//! - [`CsvFormatter`] - CSV/TSV candle export
//! - [`JsonFormatter`] - JSON array or NDJSON candle export
//! - [`ParquetFormatter`] - Apache Parquet candle export
//! - [`TickReader`] - CSV and NDJSON tick import

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candlewick-rs/candlewick/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod formatter;
mod json;
mod reader;

#[cfg(feature = "parquet")]
mod parquet;

pub use crate::csv::CsvFormatter;
pub use formatter::{CandleWriter, FormatError, InputFormat, OutputFormat, write_candles};
pub use json::{JsonFormatter, JsonStyle};
pub use reader::TickReader;

#[cfg(feature = "parquet")]
pub use crate::parquet::ParquetFormatter;
