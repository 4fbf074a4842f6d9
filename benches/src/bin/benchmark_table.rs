//! Benchmark runner that outputs a markdown table for the README.
//!
//! Run with: `cargo run --package candlewick-bench --bin benchmark_table --release`

use candlewick_bench::{
    BenchmarkResult, engine_for, epoch, format_duration, format_rate, measure, synthetic_ticks,
};
use candlewick_lib::{TickAggregator, Timeframe};
use chrono::TimeDelta;

/// Number of iterations per workload; the fastest is reported.
const ITERATIONS: usize = 3;

fn fastest(runs: impl Iterator<Item = BenchmarkResult>) -> Option<BenchmarkResult> {
    runs.min_by_key(|r| r.duration)
}

fn main() {
    println!("candlewick aggregation benchmark");
    println!("================================\n");
    println!("Running workloads ({ITERATIONS} iterations each)...\n");

    let mut results = Vec::new();
    for (label, count) in [("100k ticks", 100_000usize), ("1M ticks", 1_000_000)] {
        let ticks = synthetic_ticks(42, count, TimeDelta::days(1));

        for timeframe in Timeframe::all() {
            let name = format!("{label} -> {timeframe}");
            let best = fastest((0..ITERATIONS).map(|_| {
                measure(&name, count as u64, || {
                    let mut aggregator = TickAggregator::new(*timeframe);
                    aggregator.extend(&ticks);
                    aggregator.len() as u64
                })
            }));
            results.extend(best);
        }

        let now = epoch() + TimeDelta::days(1);
        let (engine, _clock) = engine_for(Timeframe::Minute1, TimeDelta::days(2), now);
        let _ = engine.ingest_batch(ticks);
        let name = format!("{label} refresh pass 1m");
        let best = fastest((0..ITERATIONS).map(|_| {
            measure(&name, count as u64, || {
                engine.refresh_scheduled(Timeframe::Minute1).buckets_written
            })
        }));
        results.extend(best);
    }

    println!("| Workload | Candles | Time | Throughput |");
    println!("|----------|---------|------|------------|");
    for r in &results {
        println!(
            "| {} | {} | {} | {} |",
            r.name,
            r.candles,
            format_duration(r.duration),
            format_rate(r.ticks_per_sec()),
        );
    }
}
