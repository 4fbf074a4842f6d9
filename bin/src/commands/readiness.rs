//! Readiness command implementation.

use std::path::PathBuf;

use anyhow::Result;

use crate::display::{load_store, open_archive, parse_timeframe};

/// Report whether `required` materialized candles are archived for a symbol.
pub(crate) fn show_readiness(
    symbol: &str,
    timeframe: &str,
    required: usize,
    json: bool,
    state_dir: Option<PathBuf>,
) -> Result<()> {
    let timeframe = parse_timeframe(timeframe)?;
    let archive = open_archive(state_dir, None)?;
    let store = load_store(&archive)?;
    let readiness = store.snapshot(timeframe).readiness(symbol, required);

    if json {
        println!("{}", serde_json::to_string_pretty(&readiness)?);
        return Ok(());
    }

    println!("Symbol:    {symbol}");
    println!("Timeframe: {timeframe}");
    println!("State:     {}", readiness.state);
    println!("Candles:   {}/{}", readiness.count, readiness.required);
    if readiness.retired > 0 {
        println!("Retired:   {}", readiness.retired);
    }
    Ok(())
}
