//! Argument parsing helpers and output formatting for the candlewick CLI.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use candlewick_lib::{
    Candle, CandleArchive, CandleStore, EngineConfig, OutputFormat, PairCategory, Timeframe,
    write_candles,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

/// Output format for candle listings.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Table,
    Csv,
    Json,
    Ndjson,
    Parquet,
}

impl Format {
    /// Returns the export format, or `None` for the terminal table.
    pub(crate) const fn output_format(self) -> Option<OutputFormat> {
        match self {
            Self::Table => None,
            Self::Csv => Some(OutputFormat::Csv),
            Self::Json => Some(OutputFormat::Json),
            Self::Ndjson => Some(OutputFormat::Ndjson),
            Self::Parquet => Some(OutputFormat::Parquet),
        }
    }
}

/// Parse a category string into a [`PairCategory`].
pub(crate) fn parse_category(s: &str) -> Result<PairCategory> {
    s.parse().map_err(|_| {
        let valid: Vec<_> = PairCategory::all().iter().map(PairCategory::as_str).collect();
        anyhow::anyhow!("Unknown category: {s}. Valid options: {}", valid.join(", "))
    })
}

/// Parse a timeframe string such as `5m` or `1h`.
pub(crate) fn parse_timeframe(s: &str) -> Result<Timeframe> {
    s.parse::<Timeframe>().map_err(|e| anyhow::anyhow!("{e}"))
}

/// Parse an RFC 3339 instant or a `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date or time: {s}"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Load the engine configuration, falling back to the built-in defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Open the candle archive: `--state-dir`, then the config's `state_dir`,
/// then the platform default.
pub(crate) fn open_archive(
    state_dir: Option<PathBuf>,
    config: Option<&EngineConfig>,
) -> Result<CandleArchive> {
    let path = state_dir
        .or_else(|| config.and_then(|c| c.state_dir.clone()))
        .unwrap_or_else(CandleArchive::default_path);
    CandleArchive::new(path).context("Failed to open candle archive")
}

/// Load every archived timeframe into a fresh candle store.
pub(crate) fn load_store(archive: &CandleArchive) -> Result<Arc<CandleStore>> {
    let store = Arc::new(CandleStore::new());
    let loaded = archive
        .load(&store)
        .with_context(|| format!("Failed to load archive {}", archive.base_path().display()))?;
    tracing::info!(timeframes = loaded, path = %archive.base_path().display(), "archive loaded");
    Ok(store)
}

/// Write candles to `output`, or to stdout when no path is given.
pub(crate) fn write_output(candles: &[Candle], format: Format, output: Option<&Path>) -> Result<()> {
    let Some(format) = format.output_format() else {
        print_candle_table(candles);
        return Ok(());
    };

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_candles(format, candles, BufWriter::new(file))?;
            println!("Wrote {} candles to {}", candles.len(), path.display());
        }
        None if format.is_binary() => bail!("{format} output needs --output <file>"),
        None => {
            write_candles(format, candles, BufWriter::new(std::io::stdout()))?;
        }
    }
    Ok(())
}

/// Print candles as an aligned table.
pub(crate) fn print_candle_table(candles: &[Candle]) {
    if candles.is_empty() {
        println!("No candles found.");
        return;
    }

    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12} {:>14} {:>12} {:>7} {:<12}",
        "BUCKET", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME", "VWAP", "TICKS", "STATE"
    );
    println!("{}", "-".repeat(122));

    for c in candles {
        let vwap = c.vwap.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        println!(
            "{:<20} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.4} {:>12} {:>7} {:<12}",
            c.bucket_start.format("%Y-%m-%d %H:%M"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume,
            vwap,
            c.tick_count,
            c.state,
        );
    }

    println!("\nTotal: {} candles", candles.len());
}

/// Progress bar counting ticks, hidden in quiet mode.
pub(crate) fn tick_progress(len: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ticks ({percent}%) {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}
