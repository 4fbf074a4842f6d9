//! Benchmark utilities for candlewick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use candlewick_lib::{
    CandleEngine, EngineConfig, ManualClock, MemoryTickStore, RefreshPolicy, Tick, Timeframe,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Symbols used by the synthetic workloads.
pub const SYMBOLS: [&str; 4] = ["BTC", "ETH", "SOL", "kPEPE"];

/// Start of every synthetic tick stream.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Generates `count` ticks spread over `span`, round-robin across
/// [`SYMBOLS`], with random-walk prices. Deterministic for a given seed.
pub fn synthetic_ticks(seed: u64, count: usize, span: TimeDelta) -> Vec<Tick> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = span.num_milliseconds().max(1) / i64::try_from(count.max(1)).unwrap_or(i64::MAX).max(1);
    let mut prices = [42_000.0_f64, 2_300.0, 98.0, 0.012];
    let start = epoch();

    (0..count)
        .map(|i| {
            let slot = i % SYMBOLS.len();
            let drift: f64 = rng.gen_range(-0.0005..0.0005);
            prices[slot] *= 1.0 + drift;
            let jitter = rng.gen_range(0..step.max(1));
            let offset = i64::try_from(i).unwrap_or(i64::MAX) * step + jitter;
            Tick::new(
                SYMBOLS[slot],
                start + TimeDelta::milliseconds(offset),
                prices[slot],
                rng.gen_range(0.0..5.0),
            )
        })
        .collect()
}

/// Engine over the four benchmark symbols with one timeframe enabled,
/// its policy reaching back over `start_offset`.
pub fn engine_for(timeframe: Timeframe, start_offset: TimeDelta, now: DateTime<Utc>) -> (CandleEngine, Arc<ManualClock>) {
    let policy = RefreshPolicy::new(start_offset, timeframe.duration(), timeframe.duration())
        .unwrap_or_else(|_| RefreshPolicy::default_for(timeframe));
    let config = EngineConfig {
        policies: [(timeframe, policy)].into_iter().collect(),
        ..EngineConfig::default()
    };
    let catalog: HashSet<String> = SYMBOLS.iter().map(|s| (*s).to_string()).collect();
    let clock = Arc::new(ManualClock::new(now));
    let engine = CandleEngine::new(
        Arc::new(catalog),
        Arc::new(MemoryTickStore::new()),
        clock.clone(),
        &config,
    );
    (engine, clock)
}

/// Timing of one measured workload.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// Workload name.
    pub name: String,
    /// Ticks processed.
    pub ticks: u64,
    /// Candles produced.
    pub candles: u64,
    /// Wall time.
    pub duration: Duration,
}

impl BenchmarkResult {
    /// Calculate ticks per second.
    pub fn ticks_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 { self.ticks as f64 / secs } else { 0.0 }
    }
}

/// Runs `f` and times it. `f` returns the number of candles produced.
pub fn measure(name: impl Into<String>, ticks: u64, f: impl FnOnce() -> u64) -> BenchmarkResult {
    let start = Instant::now();
    let candles = f();
    BenchmarkResult {
        name: name.into(),
        ticks,
        candles,
        duration: start.elapsed(),
    }
}

/// Formats a duration for the results table.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_secs_f64() * 1000.0;
    if millis >= 1000.0 {
        format!("{:.2}s", millis / 1000.0)
    } else {
        format!("{millis:.1}ms")
    }
}

/// Formats a rate with a k/M suffix.
pub fn format_rate(per_sec: f64) -> String {
    if per_sec >= 1_000_000.0 {
        format!("{:.2}M/s", per_sec / 1_000_000.0)
    } else if per_sec >= 1_000.0 {
        format!("{:.1}k/s", per_sec / 1_000.0)
    } else {
        format!("{per_sec:.0}/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_ticks_are_deterministic() {
        let a = synthetic_ticks(7, 100, TimeDelta::hours(1));
        let b = synthetic_ticks(7, 100, TimeDelta::hours(1));
        assert_eq!(a, b);
        assert!(a.iter().all(|t| t.validate().is_ok()));
        assert!(a.iter().all(|t| t.timestamp < epoch() + TimeDelta::hours(1)));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.0ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_rate(2_500_000.0), "2.50M/s");
        assert_eq!(format_rate(1_500.0), "1.5k/s");
    }
}
