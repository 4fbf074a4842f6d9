//! Run command implementation.
//!
//! Live mode: NDJSON ticks on stdin, wall clock, every configured timeframe
//! refreshed on its own cadence.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use candlewick_lib::{
    CandleArchive, CandleEngine, IngestError, MemoryTickStore, PairRegistry, RefreshScheduler,
    SystemClock, Tick,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::display::{load_config, load_store, open_archive};

#[derive(Debug, Default)]
struct Counters {
    admitted: u64,
    rejected: u64,
    unreadable: u64,
    stale: u64,
}

fn save(archive: &CandleArchive, engine: &CandleEngine) -> Result<()> {
    let saved = archive.save(engine.candle_store())?;
    tracing::info!(timeframes = saved, "archive saved");
    Ok(())
}

/// Drops ticks no refresh window can reach any more.
fn retire_ticks(ticks: &MemoryTickStore, engine: &CandleEngine) -> Result<()> {
    let now = engine.now();
    let earliest = engine.policies().values().map(|p| p.lookback(now)).min();
    if let Some(earliest) = earliest {
        ticks.retire_before(earliest)?;
    }
    Ok(())
}

/// Ingest stdin until EOF or Ctrl-C, then archive the candles.
pub(crate) async fn run(
    config: Option<&Path>,
    state_dir: Option<PathBuf>,
    save_every: u64,
    quiet: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let archive = open_archive(state_dir, Some(&config))?;
    let ticks = Arc::new(MemoryTickStore::new());
    let engine = Arc::new(
        CandleEngine::new(
            Arc::new(PairRegistry::global().clone()),
            Arc::clone(&ticks) as _,
            Arc::new(SystemClock),
            &config,
        )
        .with_candle_store(load_store(&archive)?),
    );

    let scheduler = RefreshScheduler::new(Arc::clone(&engine));
    scheduler.enable_all().context("Failed to start refresh tasks")?;
    for status in scheduler.status() {
        if let Some(policy) = status.policy {
            tracing::info!(
                timeframe = %status.timeframe,
                state = %status.state,
                start_offset = %policy.start_offset,
                end_offset = %policy.end_offset,
                interval = %policy.schedule_interval,
                "refresh task"
            );
        }
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("waiting for ticks on stdin");
        pb
    };

    let mut counters = Counters::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut autosave = tokio::time::interval(Duration::from_secs(save_every.max(1)));
    autosave.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    tracing::info!("stdin closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Tick>(line) {
                    Ok(tick) => match engine.ingest(tick) {
                        Ok(outcome) => {
                            counters.admitted += 1;
                            if outcome.is_stale() {
                                counters.stale += 1;
                            }
                        }
                        Err(IngestError::Rejected(_)) => counters.rejected += 1,
                        Err(IngestError::Store(e)) => tracing::warn!(error = %e, "tick store refused tick"),
                    },
                    Err(e) => {
                        counters.unreadable += 1;
                        tracing::warn!(error = %e, "skipping unreadable tick line");
                    }
                }
                if counters.admitted % 1000 == 0 {
                    spinner.set_message(format!(
                        "{} ticks admitted, {} rejected, {} stale",
                        counters.admitted, counters.rejected, counters.stale
                    ));
                }
            }
            _ = autosave.tick() => {
                retire_ticks(&ticks, &engine)?;
                save(&archive, &engine)?;
            }
            _ = &mut shutdown => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }

    scheduler.shutdown();
    save(&archive, &engine)?;
    spinner.finish_and_clear();

    println!(
        "Admitted {} ticks ({} rejected, {} unreadable, {} stale).",
        counters.admitted, counters.rejected, counters.unreadable, counters.stale
    );
    println!("Archived candles to {}", archive.base_path().display());
    Ok(())
}
