//! Refresh run records.

use std::collections::{BTreeMap, VecDeque};

use candlewick_types::{TimeRange, Timeframe};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a refresh run.
pub type RunId = Uuid;

/// Status of a refresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created but not started.
    #[default]
    Pending,
    /// Pass in progress.
    Running,
    /// Pass published its snapshot.
    Completed,
    /// Pass failed before publishing.
    Failed,
    /// Scheduled pass dropped because another pass held the timeframe.
    Skipped,
}

impl RunStatus {
    /// Returns true if the run is in a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    /// The timeframe's periodic task.
    Scheduled,
    /// An operator-requested recovery pass.
    Manual,
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        })
    }
}

/// One refresh pass over one timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRun {
    /// Unique identifier for this run.
    pub id: RunId,
    /// Timeframe refreshed.
    pub timeframe: Timeframe,
    /// What started the run.
    pub trigger: RunTrigger,
    /// Aligned bucket range covered.
    pub window: TimeRange,
    /// Current status.
    pub status: RunStatus,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Ticks read from the tick store.
    pub ticks_read: u64,
    /// Ticks read but left out: malformed, or not in the catalog.
    #[serde(default)]
    pub ticks_rejected: u64,
    /// Candles written to the store.
    pub buckets_written: u64,
    /// Error message if the run failed.
    pub error: Option<String>,
}

impl RefreshRun {
    /// Creates a pending run.
    #[must_use]
    pub fn new(
        timeframe: Timeframe,
        trigger: RunTrigger,
        window: TimeRange,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timeframe,
            trigger,
            window,
            status: RunStatus::Pending,
            started_at: now,
            completed_at: None,
            ticks_read: 0,
            ticks_rejected: 0,
            buckets_written: 0,
            error: None,
        }
    }

    /// Returns true if the run is in a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Returns how long the run took, once finished.
    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        self.completed_at.map(|end| end - self.started_at)
    }

    /// Marks the run as in progress.
    pub const fn mark_running(&mut self) {
        self.status = RunStatus::Running;
    }

    /// Marks the run as completed.
    pub fn mark_completed(&mut self, now: DateTime<Utc>, ticks_read: u64, buckets_written: u64) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(now);
        self.ticks_read = ticks_read;
        self.buckets_written = buckets_written;
    }

    /// Marks the run as failed.
    pub fn mark_failed(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(now);
        self.error = Some(error.into());
    }

    /// Marks the run as skipped.
    pub fn mark_skipped(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Skipped;
        self.completed_at = Some(now);
    }
}

/// Bounded per-timeframe history of runs, oldest first.
#[derive(Debug, Clone)]
pub struct RunHistory {
    capacity: usize,
    runs: BTreeMap<Timeframe, VecDeque<RefreshRun>>,
}

impl RunHistory {
    /// Creates a history keeping at most `capacity` runs per timeframe.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            runs: BTreeMap::new(),
        }
    }

    /// Records a run, evicting the oldest for its timeframe when full.
    pub fn record(&mut self, run: RefreshRun) {
        let runs = self.runs.entry(run.timeframe).or_default();
        if runs.len() == self.capacity {
            runs.pop_front();
        }
        runs.push_back(run);
    }

    /// Returns the runs of a timeframe, oldest first.
    #[must_use]
    pub fn runs(&self, timeframe: Timeframe) -> Vec<RefreshRun> {
        self.runs
            .get(&timeframe)
            .map(|runs| runs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the most recent run of a timeframe.
    #[must_use]
    pub fn last(&self, timeframe: Timeframe) -> Option<&RefreshRun> {
        self.runs.get(&timeframe)?.back()
    }

    /// Counts recorded runs of a timeframe with the given status.
    #[must_use]
    pub fn count(&self, timeframe: Timeframe, status: RunStatus) -> usize {
        self.runs
            .get(&timeframe)
            .map_or(0, |runs| runs.iter().filter(|r| r.status == status).count())
    }
}
