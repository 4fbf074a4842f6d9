//! Info command implementation.
//!
//! Shows one catalog pair and what the archive holds for it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use candlewick_lib::{CandleQuery, PairRegistry, Timeframe};

use crate::display::{load_store, open_archive};

/// Show pair details and the archived candle coverage per timeframe.
pub(crate) fn show_info(symbol: &str, state_dir: Option<PathBuf>) -> Result<()> {
    let registry = PairRegistry::global();
    let pair = registry
        .get(symbol)
        .with_context(|| format!("Unknown symbol: {symbol}"))?;

    println!("Pair:           {}", pair.display_name());
    println!("Symbol:         {}", pair.symbol());
    println!("Market:         {}", pair.market_name());
    println!("Category:       {}", pair.category());
    println!("Max Leverage:   {}x", pair.max_leverage());
    println!("Min Order Size: {}", pair.min_order_size());
    println!("Tick Size:      {}", pair.tick_size());
    println!("Active:         {}", if pair.is_active() { "yes" } else { "no" });

    let archive = open_archive(state_dir, None)?;
    let store = load_store(&archive)?;

    println!("\nArchived Candles ({}):", archive.base_path().display());
    println!(
        "{:<6} {:>8} {:>13} {:<17} {:<17}",
        "TF", "CANDLES", "MATERIALIZED", "FIRST", "LAST"
    );
    println!("{}", "-".repeat(65));

    for timeframe in Timeframe::all() {
        let snapshot = store.snapshot(*timeframe);
        let candles = snapshot.candles(pair.symbol(), &CandleQuery::new().including_pending());
        let fmt = |i: Option<usize>| {
            i.and_then(|i| candles.get(i))
                .map_or_else(|| "-".to_string(), |c| c.bucket_start.format("%Y-%m-%d %H:%M").to_string())
        };
        println!(
            "{:<6} {:>8} {:>13} {:<17} {:<17}",
            timeframe.as_str(),
            candles.len(),
            snapshot.materialized_count(pair.symbol()),
            fmt(Some(0)),
            fmt(candles.len().checked_sub(1)),
        );
    }

    Ok(())
}
