//! Aggregation and refresh-pass benchmarks.
//!
//! Run with: `cargo bench --package candlewick-bench`

use candlewick_bench::{engine_for, epoch, synthetic_ticks};
use candlewick_lib::{CandleBuilder, TickAggregator, Timeframe};
use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn aggregate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for count in [10_000usize, 100_000] {
        let ticks = synthetic_ticks(42, count, TimeDelta::days(1));
        group.throughput(Throughput::Elements(count as u64));

        for timeframe in [Timeframe::Minute1, Timeframe::Hour1] {
            group.bench_with_input(
                BenchmarkId::new(timeframe.as_str(), count),
                &ticks,
                |b, ticks| {
                    b.iter(|| {
                        let mut aggregator = TickAggregator::new(timeframe);
                        aggregator.extend(ticks);
                        aggregator.len()
                    });
                },
            );
        }
    }

    group.finish();
}

fn merge_benchmark(c: &mut Criterion) {
    let ticks = synthetic_ticks(9, 40_000, TimeDelta::minutes(1));
    let btc: Vec<_> = ticks.iter().filter(|t| t.symbol == "BTC").cloned().collect();
    let (left, right) = btc.split_at(btc.len() / 2);

    c.bench_function("merge_builders", |b| {
        b.iter(|| {
            let mut a = CandleBuilder::from_tick(Timeframe::Minute1, &left[0]);
            for tick in &left[1..] {
                let _ = a.push(tick);
            }
            let mut z = CandleBuilder::from_tick(Timeframe::Minute1, &right[0]);
            for tick in &right[1..] {
                let _ = z.push(tick);
            }
            a.merge(&z).map(|()| a.tick_count())
        });
    });
}

fn refresh_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_pass");
    group.sample_size(20);

    for count in [10_000usize, 100_000] {
        let ticks = synthetic_ticks(3, count, TimeDelta::hours(6));
        let now = epoch() + TimeDelta::hours(6);
        let (engine, _clock) = engine_for(Timeframe::Minute5, TimeDelta::hours(7), now);
        let _ = engine.ingest_batch(ticks);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| engine.refresh_scheduled(Timeframe::Minute5).buckets_written);
        });
    }

    group.finish();
}

criterion_group!(benches, aggregate_benchmark, merge_benchmark, refresh_benchmark);
criterion_main!(benches);
