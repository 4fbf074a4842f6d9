//! The materializer: ingestion, refresh passes and reads.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use candlewick_aggregate::{Candle, CandleState, TickAggregator};
use candlewick_catalog::{GateStats, SymbolCatalog, SymbolGate};
use candlewick_store::{
    CandleQuery, CandleSnapshot, CandleStore, PriceStatistics, Readiness, RetentionSummary,
    TickStore,
};
use candlewick_types::{Tick, TimeRange, Timeframe, bucket_start};
use chrono::{DateTime, Utc};

use crate::{
    Clock, EngineConfig, IngestError, RefreshError, RefreshPolicy, RefreshRun, RefreshWindow,
    RunHistory, RunStatus, RunTrigger,
};

/// What happened to an admitted tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestOutcome {
    /// Timeframes whose refresh window had already moved past the tick's
    /// bucket. The tick is stored but those candles will not see it until a
    /// manual refresh covers the bucket.
    pub stale: Vec<Timeframe>,
}

impl IngestOutcome {
    /// Returns true if any timeframe missed the tick.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Tally of a batch ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    /// Ticks stored.
    pub admitted: u64,
    /// Ticks refused by the gate.
    pub rejected: u64,
    /// Stored ticks that missed at least one timeframe's window.
    pub stale: u64,
    /// Ticks the tick store refused.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Lane {
    flight: Mutex<()>,
    stale_misses: AtomicU64,
}

/// Incremental multi-resolution candle materializer.
///
/// Ticks pass the [`SymbolGate`] into the tick store. Each timeframe is
/// refreshed independently by recomputing its window from raw ticks and
/// committing the result to the [`CandleStore`] in one swap. At most one
/// pass per timeframe runs at a time.
pub struct CandleEngine {
    gate: SymbolGate,
    ticks: Arc<dyn TickStore>,
    candles: Arc<CandleStore>,
    clock: Arc<dyn Clock>,
    policies: RwLock<BTreeMap<Timeframe, RefreshPolicy>>,
    lanes: Vec<Lane>,
    history: Mutex<RunHistory>,
}

impl std::fmt::Debug for CandleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEngine")
            .field("gate", &self.gate)
            .field("clock", &self.clock)
            .field("policies", &self.policies())
            .finish_non_exhaustive()
    }
}

impl CandleEngine {
    /// Creates an engine with an empty candle store.
    pub fn new(
        catalog: Arc<dyn SymbolCatalog>,
        ticks: Arc<dyn TickStore>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gate: SymbolGate::new(catalog),
            ticks,
            candles: Arc::new(CandleStore::new()),
            clock,
            policies: RwLock::new(config.policies.clone()),
            lanes: Timeframe::all().iter().map(|_| Lane::default()).collect(),
            history: Mutex::new(RunHistory::new(config.run_history)),
        }
    }

    /// Uses `candles` as the candle store, e.g. one restored from an archive.
    #[must_use]
    pub fn with_candle_store(mut self, candles: Arc<CandleStore>) -> Self {
        self.candles = candles;
        self
    }

    fn lane(&self, timeframe: Timeframe) -> &Lane {
        &self.lanes[timeframe as usize]
    }

    fn history(&self) -> MutexGuard<'_, RunHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the admission gate.
    #[must_use]
    pub const fn gate(&self) -> &SymbolGate {
        &self.gate
    }

    /// Returns the admission counters.
    #[must_use]
    pub fn gate_stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Returns the candle store.
    #[must_use]
    pub const fn candle_store(&self) -> &Arc<CandleStore> {
        &self.candles
    }

    /// Returns the engine clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the enabled timeframes and their policies.
    #[must_use]
    pub fn policies(&self) -> BTreeMap<Timeframe, RefreshPolicy> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the policy of a timeframe, if enabled.
    #[must_use]
    pub fn policy(&self, timeframe: Timeframe) -> Option<RefreshPolicy> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&timeframe)
            .copied()
    }

    /// Installs or replaces a policy. Only windows computed afterwards are
    /// affected.
    pub fn set_policy(&self, timeframe: Timeframe, policy: RefreshPolicy) {
        self.policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(timeframe, policy);
        tracing::info!(%timeframe, "refresh policy updated");
    }

    /// Validates and stores one tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the gate rejects the tick or the tick store
    /// refuses it.
    pub fn ingest(&self, tick: Tick) -> Result<IngestOutcome, IngestError> {
        let tick = self.gate.admit(tick)?;
        let now = self.clock.now();

        let mut outcome = IngestOutcome::default();
        for (timeframe, policy) in self.policies.read().unwrap_or_else(PoisonError::into_inner).iter() {
            let window = policy.window(*timeframe, now);
            if bucket_start(tick.timestamp, *timeframe) < window.range().start {
                self.lane(*timeframe).stale_misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    symbol = %tick.symbol,
                    %timeframe,
                    timestamp = %tick.timestamp,
                    "tick bucket already left the refresh window"
                );
                outcome.stale.push(*timeframe);
            }
        }

        self.ticks.append(tick)?;
        Ok(outcome)
    }

    /// Ingests a batch, counting outcomes instead of stopping on errors.
    pub fn ingest_batch(&self, ticks: impl IntoIterator<Item = Tick>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for tick in ticks {
            match self.ingest(tick) {
                Ok(outcome) => {
                    summary.admitted += 1;
                    if outcome.is_stale() {
                        summary.stale += 1;
                    }
                }
                Err(IngestError::Rejected(_)) => summary.rejected += 1,
                Err(IngestError::Store(err)) => {
                    summary.failed += 1;
                    tracing::warn!(error = %err, "tick store refused tick");
                }
            }
        }
        summary
    }

    /// Returns how many admitted ticks missed a timeframe's window.
    #[must_use]
    pub fn stale_misses(&self, timeframe: Timeframe) -> u64 {
        self.lane(timeframe).stale_misses.load(Ordering::Relaxed)
    }

    /// Runs one scheduled pass over the policy window at the current time.
    ///
    /// If another pass of the same timeframe holds the lane, the run is
    /// recorded as [`RunStatus::Skipped`] without waiting.
    pub fn refresh_scheduled(&self, timeframe: Timeframe) -> RefreshRun {
        let now = self.clock.now();
        let Some(policy) = self.policy(timeframe) else {
            let mut run = RefreshRun::new(
                timeframe,
                RunTrigger::Scheduled,
                TimeRange { start: now, end: now },
                now,
            );
            run.mark_failed(now, RefreshError::NoPolicy(timeframe).to_string());
            return self.finish(run);
        };

        let window = policy.window(timeframe, now);
        let mut run = RefreshRun::new(timeframe, RunTrigger::Scheduled, *window.range(), now);

        let _flight = match self.lane(timeframe).flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                run.mark_skipped(now);
                return self.finish(run);
            }
        };

        run.mark_running();
        if let Err(err) = self.pass(&window, policy.finality(now), &mut run) {
            run.mark_failed(self.clock.now(), err.to_string());
        }
        self.finish(run)
    }

    /// Recomputes every bucket whose start lies in `range`, waiting for any
    /// pass of the same timeframe to finish first.
    ///
    /// Buckets are finalized against the timeframe's policy, or its default
    /// policy when the timeframe is not enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is empty or the pass fails. A failed run
    /// is still recorded in the history.
    pub fn refresh_range(
        &self,
        timeframe: Timeframe,
        range: &TimeRange,
    ) -> Result<RefreshRun, RefreshError> {
        let now = self.clock.now();
        let window = RefreshWindow::covering(timeframe, range);
        let mut run = RefreshRun::new(timeframe, RunTrigger::Manual, *window.range(), now);

        if range.start >= range.end {
            let err = RefreshError::InvalidWindow(range.to_string());
            run.mark_failed(now, err.to_string());
            self.finish(run);
            return Err(err);
        }

        let policy = self
            .policy(timeframe)
            .unwrap_or_else(|| RefreshPolicy::default_for(timeframe));
        let _flight = self
            .lane(timeframe)
            .flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        run.mark_running();
        match self.pass(&window, policy.finality(self.clock.now()), &mut run) {
            Ok(()) => Ok(self.finish(run)),
            Err(err) => {
                run.mark_failed(self.clock.now(), err.to_string());
                self.finish(run);
                Err(err)
            }
        }
    }

    /// Reads, aggregates and commits one window. Caller holds the lane.
    fn pass(
        &self,
        window: &RefreshWindow,
        finality: DateTime<Utc>,
        run: &mut RefreshRun,
    ) -> Result<(), RefreshError> {
        let timeframe = window.timeframe();
        let ticks = self.ticks.read_range(window.range())?;

        let catalog = self.gate.catalog();
        let mut aggregator = TickAggregator::new(timeframe);
        let mut rejected = 0u64;
        for tick in &ticks {
            if let Err(err) = tick.validate() {
                rejected += 1;
                tracing::debug!(%timeframe, symbol = %tick.symbol, error = %err, "skipping malformed stored tick");
                continue;
            }
            match catalog.resolve(&tick.symbol) {
                Some(canonical) if canonical == tick.symbol => aggregator.process(tick),
                Some(canonical) => {
                    let mut tick = tick.clone();
                    tick.symbol = canonical.to_string();
                    aggregator.process(&tick);
                }
                None => {
                    rejected += 1;
                    tracing::debug!(%timeframe, symbol = %tick.symbol, "skipping stored tick for unknown or inactive symbol");
                }
            }
        }

        let boundary = self
            .candles
            .snapshot(timeframe)
            .watermark()
            .map_or(finality, |w| w.max(finality));
        let candles = aggregator.finish(|key| {
            if key.bucket_end() <= boundary {
                CandleState::Materialized
            } else {
                CandleState::Pending
            }
        });
        let summary = self.candles.commit(timeframe, candles, boundary)?;

        run.ticks_rejected = rejected;
        run.mark_completed(self.clock.now(), ticks.len() as u64, summary.written as u64);
        tracing::info!(
            %timeframe,
            trigger = %run.trigger,
            window = %run.window,
            ticks = run.ticks_read,
            rejected = run.ticks_rejected,
            buckets = run.buckets_written,
            promoted = summary.promoted,
            version = summary.version,
            "refresh pass completed"
        );
        Ok(())
    }

    fn finish(&self, run: RefreshRun) -> RefreshRun {
        match run.status {
            RunStatus::Failed => tracing::warn!(
                timeframe = %run.timeframe,
                trigger = %run.trigger,
                error = run.error.as_deref().unwrap_or_default(),
                "refresh pass failed"
            ),
            RunStatus::Skipped => tracing::debug!(
                timeframe = %run.timeframe,
                "refresh pass skipped, previous pass still running"
            ),
            _ => {}
        }
        self.history().record(run.clone());
        run
    }

    /// Returns recorded runs of a timeframe, oldest first.
    #[must_use]
    pub fn runs(&self, timeframe: Timeframe) -> Vec<RefreshRun> {
        self.history().runs(timeframe)
    }

    /// Counts recorded runs of a timeframe with `status`.
    #[must_use]
    pub fn run_count(&self, timeframe: Timeframe, status: RunStatus) -> usize {
        self.history().count(timeframe, status)
    }

    /// Returns the most recent run of a timeframe.
    #[must_use]
    pub fn last_run(&self, timeframe: Timeframe) -> Option<RefreshRun> {
        self.history().last(timeframe).cloned()
    }

    /// Removes candles of a timeframe whose bucket starts before `cutoff`.
    ///
    /// Waits for any running pass of the timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error if the candle store cannot be written.
    pub fn apply_retention(
        &self,
        timeframe: Timeframe,
        cutoff: DateTime<Utc>,
    ) -> Result<RetentionSummary, RefreshError> {
        let _flight = self
            .lane(timeframe)
            .flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(self.candles.retire_before(timeframe, cutoff)?)
    }

    /// Returns the latest finality boundary committed for a timeframe.
    #[must_use]
    pub fn watermark(&self, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        self.candles.snapshot(timeframe).watermark()
    }

    /// Returns the current snapshot of a timeframe.
    #[must_use]
    pub fn snapshot(&self, timeframe: Timeframe) -> Arc<CandleSnapshot> {
        self.candles.snapshot(timeframe)
    }

    /// Returns candles ascending by bucket start from one consistent snapshot.
    ///
    /// Pending candles are left out unless `query` opts in, so an empty
    /// result agrees with a not-ready [`readiness`](Self::readiness).
    #[must_use]
    pub fn get_candles(&self, symbol: &str, timeframe: Timeframe, query: &CandleQuery) -> Vec<Candle> {
        self.snapshot(timeframe).candles(symbol, query)
    }

    /// Returns the most recent materialized candle.
    #[must_use]
    pub fn latest_candle(&self, symbol: &str, timeframe: Timeframe) -> Option<Candle> {
        self.snapshot(timeframe).latest(symbol, &CandleQuery::new()).cloned()
    }

    /// Counts candles matching `query`.
    #[must_use]
    pub fn candle_count(&self, symbol: &str, timeframe: Timeframe, query: &CandleQuery) -> usize {
        self.snapshot(timeframe).count(symbol, query)
    }

    /// Computes price statistics over candles matching `query`.
    #[must_use]
    pub fn price_statistics(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        query: &CandleQuery,
    ) -> Option<PriceStatistics> {
        self.snapshot(timeframe).statistics(symbol, query)
    }

    /// Answers whether at least `required` materialized candles exist.
    #[must_use]
    pub fn readiness(&self, symbol: &str, timeframe: Timeframe, required: usize) -> Readiness {
        self.snapshot(timeframe).readiness(symbol, required)
    }
}
