//! Prune command implementation.
//!
//! Applies retention to one archived timeframe.

use std::path::PathBuf;

use anyhow::{Context, Result};
use candlewick_lib::CandleQuery;
use chrono::TimeDelta;
use inquire::Confirm;

use crate::display::{load_store, open_archive, parse_instant, parse_timeframe};

/// Remove archived candles of `timeframe` whose bucket starts before `before`.
pub(crate) fn prune(
    timeframe: &str,
    before: &str,
    yes: bool,
    state_dir: Option<PathBuf>,
) -> Result<()> {
    let timeframe = parse_timeframe(timeframe)?;
    let cutoff = parse_instant(before)?;

    let archive = open_archive(state_dir, None)?;
    let store = load_store(&archive)?;
    let snapshot = store.snapshot(timeframe);

    let doomed = CandleQuery::new()
        .between(None, Some(cutoff - TimeDelta::milliseconds(1)))
        .including_pending();
    let affected: Vec<_> = snapshot
        .symbols()
        .into_iter()
        .map(|symbol| (symbol.to_string(), snapshot.count(symbol, &doomed)))
        .filter(|(_, count)| *count > 0)
        .collect();
    let total: usize = affected.iter().map(|(_, count)| count).sum();

    if total == 0 {
        println!("Nothing to prune: no {timeframe} candles before {cutoff}.");
        return Ok(());
    }

    println!("{:<10} {:>10}", "SYMBOL", "CANDLES");
    println!("{}", "-".repeat(21));
    for (symbol, count) in &affected {
        println!("{symbol:<10} {count:>10}");
    }
    println!("\nTotal: {total} {timeframe} candles before {cutoff}");

    if !yes {
        let confirmed = Confirm::new("Remove these candles from the archive?")
            .with_default(false)
            .prompt()
            .context("Prune confirmation cancelled")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let summary = store.retire_before(timeframe, cutoff)?;
    archive.save_snapshot(&store.snapshot(timeframe))?;
    println!(
        "Removed {} candles ({} materialized).",
        summary.removed, summary.removed_materialized
    );
    Ok(())
}
