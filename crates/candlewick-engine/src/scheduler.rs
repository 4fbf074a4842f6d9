//! Background refresh scheduling on the tokio runtime.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use candlewick_types::{TimeRange, Timeframe};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{CandleEngine, PolicySummary, RefreshRun, SchedulerError};

/// Lifecycle of one timeframe's recurring refresh task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Registered but never started.
    Initialized,
    /// Firing every schedule interval.
    Enabled,
    /// Stopped; committed candles stay readable.
    Disabled,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Initialized => "initialized",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        })
    }
}

/// Point-in-time view of one refresh task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    /// Timeframe refreshed by the task.
    pub timeframe: Timeframe,
    /// Task lifecycle state.
    pub state: TaskState,
    /// Current policy, absent once the timeframe's policy is gone.
    pub policy: Option<PolicySummary>,
    /// Most recent run, if any.
    pub last_run: Option<RefreshRun>,
}

#[derive(Debug)]
struct Task {
    state: TaskState,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Drives [`CandleEngine::refresh_scheduled`] for every enabled timeframe.
///
/// Each tick of a task's interval hands one pass to the blocking pool
/// without waiting for the previous one, so a pass that overruns its
/// interval shows up as a skipped run rather than a queue.
#[derive(Debug)]
pub struct RefreshScheduler {
    engine: Arc<CandleEngine>,
    tasks: Mutex<BTreeMap<Timeframe, Task>>,
    shut_down: AtomicBool,
}

impl RefreshScheduler {
    /// Registers one task per timeframe with a policy.
    pub fn new(engine: Arc<CandleEngine>) -> Self {
        let tasks = engine
            .policies()
            .into_keys()
            .map(|timeframe| {
                (
                    timeframe,
                    Task {
                        state: TaskState::Initialized,
                        handle: None,
                    },
                )
            })
            .collect();
        Self {
            engine,
            tasks: Mutex::new(tasks),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Returns the engine being driven.
    #[must_use]
    pub const fn engine(&self) -> &Arc<CandleEngine> {
        &self.engine
    }

    fn tasks(&self) -> MutexGuard<'_, BTreeMap<Timeframe, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_running(&self) -> Result<(), SchedulerError> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(SchedulerError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Starts the recurring task of a timeframe. Enabling an enabled task is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is shut down, the timeframe has no
    /// policy, or no tokio runtime is current.
    pub fn enable(&self, timeframe: Timeframe) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        let policy = self
            .engine
            .policy(timeframe)
            .ok_or(SchedulerError::UnknownTask(timeframe))?;
        let runtime = Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let mut tasks = self.tasks();
        let task = tasks.entry(timeframe).or_insert(Task {
            state: TaskState::Initialized,
            handle: None,
        });
        if task.state == TaskState::Enabled {
            return Ok(());
        }

        let period = policy
            .schedule_interval()
            .to_std()
            .unwrap_or(Duration::from_secs(1));
        let engine = Arc::clone(&self.engine);
        task.handle = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let engine = Arc::clone(&engine);
                drop(tokio::task::spawn_blocking(move || {
                    engine.refresh_scheduled(timeframe)
                }));
            }
        }));
        task.state = TaskState::Enabled;
        tracing::info!(%timeframe, ?period, "refresh task enabled");
        Ok(())
    }

    /// Stops the recurring task of a timeframe. A pass already handed to the
    /// blocking pool runs to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeframe has no task.
    pub fn disable(&self, timeframe: Timeframe) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks();
        let task = tasks
            .get_mut(&timeframe)
            .ok_or(SchedulerError::UnknownTask(timeframe))?;
        task.stop();
        if task.state == TaskState::Enabled {
            task.state = TaskState::Disabled;
            tracing::info!(%timeframe, "refresh task disabled");
        }
        Ok(())
    }

    /// Enables every registered task.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::enable`].
    pub fn enable_all(&self) -> Result<(), SchedulerError> {
        let timeframes: Vec<_> = self.tasks().keys().copied().collect();
        for timeframe in timeframes {
            self.enable(timeframe)?;
        }
        Ok(())
    }

    /// Disables every registered task.
    pub fn disable_all(&self) {
        for (timeframe, task) in self.tasks().iter_mut() {
            task.stop();
            if task.state == TaskState::Enabled {
                task.state = TaskState::Disabled;
                tracing::info!(%timeframe, "refresh task disabled");
            }
        }
    }

    /// Disables everything and refuses further work.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            self.disable_all();
            tracing::info!("refresh scheduler shut down");
        }
    }

    /// Returns true once [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Runs a manual refresh of `range` on the blocking pool and waits for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is shut down, the pass fails, or the
    /// blocking task is cancelled.
    pub async fn trigger(
        &self,
        timeframe: Timeframe,
        range: TimeRange,
    ) -> Result<RefreshRun, SchedulerError> {
        self.ensure_running()?;
        let engine = Arc::clone(&self.engine);
        let run = tokio::task::spawn_blocking(move || engine.refresh_range(timeframe, &range))
            .await
            .map_err(|e| SchedulerError::Join(e.to_string()))??;
        Ok(run)
    }

    /// Returns the state of a timeframe's task.
    #[must_use]
    pub fn state(&self, timeframe: Timeframe) -> Option<TaskState> {
        self.tasks().get(&timeframe).map(|task| task.state)
    }

    /// Returns the status of every registered task.
    #[must_use]
    pub fn status(&self) -> Vec<TaskStatus> {
        let states: Vec<_> = self
            .tasks()
            .iter()
            .map(|(timeframe, task)| (*timeframe, task.state))
            .collect();
        states
            .into_iter()
            .map(|(timeframe, state)| TaskStatus {
                timeframe,
                state,
                policy: self.engine.policy(timeframe).as_ref().map(PolicySummary::from),
                last_run: self.engine.last_run(timeframe),
            })
            .collect()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        for task in self.tasks().values_mut() {
            task.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, ManualClock, RefreshPolicy, RunStatus};
    use candlewick_store::MemoryTickStore;
    use candlewick_types::Tick;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::collections::HashSet;

    fn at(m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, m, s).unwrap()
    }

    fn engine(interval: TimeDelta) -> Arc<CandleEngine> {
        let policy = RefreshPolicy::new(TimeDelta::hours(1), TimeDelta::minutes(1), interval).unwrap();
        let config = EngineConfig {
            policies: [(Timeframe::Minute1, policy)].into_iter().collect(),
            ..EngineConfig::default()
        };
        let catalog: HashSet<String> = ["X".to_string()].into_iter().collect();
        Arc::new(CandleEngine::new(
            Arc::new(catalog),
            Arc::new(MemoryTickStore::new()),
            Arc::new(ManualClock::new(at(10, 0))),
            &config,
        ))
    }

    #[test]
    fn test_new_registers_policies() {
        let scheduler = RefreshScheduler::new(engine(TimeDelta::minutes(1)));
        assert_eq!(scheduler.state(Timeframe::Minute1), Some(TaskState::Initialized));
        assert_eq!(scheduler.state(Timeframe::Hour1), None);
        let status = scheduler.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].policy.as_ref().unwrap().start_offset, "1h");
        assert!(status[0].last_run.is_none());
    }

    #[test]
    fn test_enable_outside_runtime() {
        let scheduler = RefreshScheduler::new(engine(TimeDelta::minutes(1)));
        assert!(matches!(
            scheduler.enable(Timeframe::Minute1),
            Err(SchedulerError::NoRuntime(_))
        ));
    }

    #[tokio::test]
    async fn test_enable_unknown_timeframe() {
        let scheduler = RefreshScheduler::new(engine(TimeDelta::minutes(1)));
        assert!(matches!(
            scheduler.enable(Timeframe::Day1),
            Err(SchedulerError::UnknownTask(Timeframe::Day1))
        ));
        assert!(scheduler.disable(Timeframe::Day1).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_enabled_task_runs_passes() {
        let engine = engine(TimeDelta::milliseconds(20));
        let scheduler = RefreshScheduler::new(Arc::clone(&engine));
        scheduler.enable(Timeframe::Minute1).unwrap();
        scheduler.enable(Timeframe::Minute1).unwrap();
        assert_eq!(scheduler.state(Timeframe::Minute1), Some(TaskState::Enabled));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!engine.runs(Timeframe::Minute1).is_empty());

        scheduler.disable(Timeframe::Minute1).unwrap();
        assert_eq!(scheduler.state(Timeframe::Minute1), Some(TaskState::Disabled));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = engine.runs(Timeframe::Minute1).len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.runs(Timeframe::Minute1).len(), settled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_trigger_runs_manual_pass() {
        let engine = engine(TimeDelta::minutes(1));
        engine.ingest(Tick::new("X", at(3, 10), 5.0, 1.0)).unwrap();
        let scheduler = RefreshScheduler::new(Arc::clone(&engine));

        let range = TimeRange::new(at(0, 0), at(5, 0)).unwrap();
        let run = scheduler.trigger(Timeframe::Minute1, range).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.buckets_written, 1);
        assert!(engine.latest_candle("X", Timeframe::Minute1).unwrap().is_materialized());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_work() {
        let scheduler = RefreshScheduler::new(engine(TimeDelta::minutes(1)));
        scheduler.enable_all().unwrap();
        scheduler.shutdown();
        assert!(scheduler.is_shut_down());
        assert_eq!(scheduler.state(Timeframe::Minute1), Some(TaskState::Disabled));
        assert!(matches!(
            scheduler.enable(Timeframe::Minute1),
            Err(SchedulerError::ShutDown)
        ));
        let range = TimeRange::new(at(0, 0), at(5, 0)).unwrap();
        assert!(matches!(
            scheduler.trigger(Timeframe::Minute1, range).await,
            Err(SchedulerError::ShutDown)
        ));
    }
}
