//! CSV candle export and tick rows.

use std::io::Write;

use candlewick_aggregate::Candle;
use candlewick_types::Tick;
use chrono::{DateTime, Utc};

use crate::{CandleWriter, FormatError};

/// Header written before candle rows, without delimiters.
const CANDLE_COLUMNS: [&str; 11] = [
    "bucket_start",
    "symbol",
    "timeframe",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "vwap",
    "tick_count",
    "state",
];

/// CSV formatter.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: char,
    /// Whether to include header row.
    include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated values (TSV) formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self {
            delimiter: '\t',
            include_header: true,
        }
    }
}

impl CandleWriter for CsvFormatter {
    fn write_candles<W: Write + Send>(
        &self,
        candles: &[Candle],
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(writer, "{}", CANDLE_COLUMNS.join(&d.to_string()))?;
        }

        for candle in candles {
            // empty vwap field when the bucket traded no volume
            let vwap = candle.vwap.map(|v| v.to_string()).unwrap_or_default();
            writeln!(
                writer,
                "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                candle.bucket_start.format("%Y-%m-%dT%H:%M:%SZ"),
                candle.symbol,
                candle.timeframe,
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
                vwap,
                candle.tick_count,
                candle.state,
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    fn extension(&self) -> &str {
        if self.delimiter == '\t' { "tsv" } else { "csv" }
    }
}

/// Returns true for a `symbol,timestamp,...` header row.
pub(crate) fn is_tick_header(line: &str) -> bool {
    line.split(',')
        .next()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("symbol"))
}

/// Parses a `symbol,timestamp,price,volume` row.
///
/// The timestamp is RFC 3339 or integer epoch milliseconds.
pub(crate) fn parse_tick_row(line: &str, line_no: usize) -> Result<Tick, FormatError> {
    let err = |message: String| FormatError::Parse {
        line: line_no,
        message,
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [symbol, timestamp, price, volume] = fields[..] else {
        return Err(err(format!("expected 4 fields, found {}", fields.len())));
    };

    let timestamp = parse_timestamp(timestamp).ok_or_else(|| err(format!("bad timestamp '{timestamp}'")))?;
    let price: f64 = price.parse().map_err(|_| err(format!("bad price '{price}'")))?;
    let volume: f64 = volume.parse().map_err(|_| err(format!("bad volume '{volume}'")))?;

    Ok(Tick::new(symbol, timestamp, price, volume))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewick_aggregate::CandleState;
    use candlewick_types::Timeframe;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn create_test_candle(vwap: Option<f64>) -> Candle {
        Candle {
            bucket_start: Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap(),
            symbol: "ETH".to_string(),
            timeframe: Timeframe::Minute15,
            open: 2500.0,
            high: 2510.5,
            low: 2495.0,
            close: 2501.25,
            volume: if vwap.is_some() { 12.0 } else { 0.0 },
            vwap,
            tick_count: 42,
            state: CandleState::Materialized,
        }
    }

    fn render(formatter: &CsvFormatter, candles: &[Candle]) -> String {
        let mut output = Cursor::new(Vec::new());
        formatter.write_candles(candles, &mut output).unwrap();
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn test_csv_candles() {
        let result = render(&CsvFormatter::new(), &[create_test_candle(Some(2503.0))]);
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(
            lines[0],
            "bucket_start,symbol,timeframe,open,high,low,close,volume,vwap,tick_count,state"
        );
        assert_eq!(
            lines[1],
            "2024-01-15T12:30:00Z,ETH,15m,2500,2510.5,2495,2501.25,12,2503,42,materialized"
        );
    }

    #[test]
    fn test_csv_missing_vwap_is_empty_field() {
        let result = render(&CsvFormatter::new().with_header(false), &[create_test_candle(None)]);
        assert!(result.contains(",0,,42,"));
        assert!(!result.contains("bucket_start"));
    }

    #[test]
    fn test_tsv() {
        let formatter = CsvFormatter::tsv();
        assert_eq!(formatter.extension(), "tsv");
        let result = render(&formatter, &[create_test_candle(None)]);
        assert!(result.starts_with("bucket_start\tsymbol\ttimeframe"));
    }

    #[test]
    fn test_parse_tick_row() {
        let tick = parse_tick_row("BTC, 2024-01-01T00:00:10Z, 42000.5, 0.25", 2).unwrap();
        assert_eq!(tick.symbol, "BTC");
        assert_eq!(tick.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap());
        assert_eq!(tick.price, 42000.5);

        let millis = parse_tick_row("BTC,1704067210000,1,1", 3).unwrap();
        assert_eq!(millis.timestamp, tick.timestamp);
    }

    #[test]
    fn test_parse_tick_row_errors_carry_line() {
        let err = parse_tick_row("BTC,yesterday,1,1", 7).unwrap_err();
        assert!(matches!(err, FormatError::Parse { line: 7, .. }));
        assert!(parse_tick_row("BTC,1,2", 1).is_err());
        assert!(is_tick_header("Symbol,timestamp,price,volume"));
        assert!(!is_tick_header("BTC,1,2,3"));
    }
}
