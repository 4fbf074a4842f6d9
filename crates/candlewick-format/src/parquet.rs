//! Apache Parquet candle export.

use std::io::Write;
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use candlewick_aggregate::Candle;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::{CandleWriter, FormatError};

/// Parquet formatter.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Arrow schema for candle rows. `vwap` is the only nullable column.
    fn candle_schema() -> Schema {
        Schema::new(vec![
            Field::new(
                "bucket_start",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("timeframe", DataType::Utf8, false),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
            Field::new("vwap", DataType::Float64, true),
            Field::new("tick_count", DataType::UInt64, false),
            Field::new("state", DataType::Utf8, false),
        ])
    }

    fn candles_to_batch(schema: &Arc<Schema>, candles: &[Candle]) -> Result<RecordBatch, FormatError> {
        let column = |f: fn(&Candle) -> f64| Float64Array::from_iter_values(candles.iter().map(f));

        let starts = candles.iter().map(|c| c.bucket_start.timestamp_micros());
        let symbols = candles.iter().map(|c| Some(c.symbol.as_str()));
        let timeframes = candles.iter().map(|c| Some(c.timeframe.as_str()));
        let states = candles.iter().map(|c| Some(c.state.as_str()));

        RecordBatch::try_new(
            Arc::clone(schema),
            vec![
                Arc::new(TimestampMicrosecondArray::from_iter_values(starts).with_timezone("UTC")),
                Arc::new(StringArray::from_iter(symbols)),
                Arc::new(StringArray::from_iter(timeframes)),
                Arc::new(column(|c| c.open)),
                Arc::new(column(|c| c.high)),
                Arc::new(column(|c| c.low)),
                Arc::new(column(|c| c.close)),
                Arc::new(column(|c| c.volume)),
                Arc::new(Float64Array::from_iter(candles.iter().map(|c| c.vwap))),
                Arc::new(UInt64Array::from_iter_values(candles.iter().map(|c| c.tick_count))),
                Arc::new(StringArray::from_iter(states)),
            ],
        )
        .map_err(|e| FormatError::Parquet(e.to_string()))
    }
}

impl CandleWriter for ParquetFormatter {
    fn write_candles<W: Write + Send>(&self, candles: &[Candle], writer: W) -> Result<(), FormatError> {
        let schema = Arc::new(Self::candle_schema());
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props))
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        for chunk in candles.chunks(self.row_group_size.max(1)) {
            let batch = Self::candles_to_batch(&schema, chunk)?;
            arrow_writer
                .write(&batch)
                .map_err(|e| FormatError::Parquet(e.to_string()))?;
        }

        arrow_writer
            .close()
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        Ok(())
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use candlewick_aggregate::CandleState;
    use candlewick_types::Timeframe;
    use chrono::{TimeZone, Utc};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn create_test_candle(hour: u32, vwap: Option<f64>) -> Candle {
        Candle {
            bucket_start: Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap(),
            symbol: "BTC".to_string(),
            timeframe: Timeframe::Hour1,
            open: 42_000.0,
            high: 42_500.0,
            low: 41_900.0,
            close: 42_100.0,
            volume: vwap.map_or(0.0, |_| 3.5),
            vwap,
            tick_count: 1200,
            state: CandleState::Materialized,
        }
    }

    #[test]
    fn test_parquet_magic() {
        let mut output = Vec::new();
        ParquetFormatter::new()
            .write_candles(&[create_test_candle(0, Some(42_050.0))], &mut output)
            .unwrap();
        assert!(output.len() > 4);
        assert_eq!(&output[0..4], b"PAR1");
    }

    #[test]
    fn test_candle_schema() {
        let schema = ParquetFormatter::candle_schema();
        assert_eq!(schema.fields().len(), 11);
        assert!(schema.field_with_name("vwap").unwrap().is_nullable());
        assert!(!schema.field_with_name("open").unwrap().is_nullable());
    }

    #[test]
    fn test_parquet_read_back() {
        let file = tempfile::tempfile().unwrap();
        let candles = [create_test_candle(0, Some(42_050.0)), create_test_candle(1, None)];
        ParquetFormatter::new()
            .with_row_group_size(1)
            .write_candles(&candles, file.try_clone().unwrap())
            .unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(Result::unwrap).collect();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 2);

        let last = batches.last().unwrap();
        assert!(last.column_by_name("vwap").unwrap().is_null(0));
    }
}
