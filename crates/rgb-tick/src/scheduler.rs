//! Tick-driven reference host.
//!
//! The thread that creates a [`TickScheduler`] becomes the privileged thread
//! and is expected to call [`TickScheduler::tick`]. Region buckets and async
//! tasks run on a dedicated worker pool, never on the privileged thread.

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rgb_spatial::{Anchor, BlockPos, Color, RegionKey, WorldId};
use tracing::{debug, error, trace};

use crate::error::ScheduleError;
use crate::host::{RegionScheduler, WorldView};
use crate::task::{CancelOutcome, ExecutionState, Job, Lane, ScheduledTask, TaskRef};
use crate::ticks::{TICK_DURATION, duration_to_ticks};
use crate::worlds::WorldList;

/// A task queued on the reference host.
struct TickTask {
    job: Job,
    lane: Lane,
    period: Option<u64>,
    next_due: AtomicU64,
    state: AtomicU8,
}

impl TickTask {
    fn new(job: Job, lane: Lane, due: u64, period: Option<u64>) -> Self {
        Self {
            job,
            lane,
            period,
            next_due: AtomicU64::new(due),
            state: AtomicU8::new(ExecutionState::Idle as u8),
        }
    }

    fn transition(&self, from: ExecutionState, to: ExecutionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the task for one run. Fails once cancelled.
    fn begin(&self) -> bool {
        self.transition(ExecutionState::Idle, ExecutionState::Running)
    }

    fn end(&self) {
        let done = if self.period.is_some() {
            ExecutionState::Idle
        } else {
            ExecutionState::Finished
        };
        if !self.transition(ExecutionState::Running, done) {
            // Cancelled mid-run.
            self.state
                .store(ExecutionState::Cancelled as u8, Ordering::Release);
        }
    }

    fn run(&self) -> bool {
        if !self.begin() {
            return false;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.job)())) {
            error!(
                lane = %self.lane,
                "scheduled task panicked: {}",
                panic_message(payload.as_ref())
            );
        }
        self.end();
        true
    }
}

impl ScheduledTask for TickTask {
    fn cancel(&self) -> CancelOutcome {
        loop {
            let current = self.execution_state();
            let (next, outcome) = match current {
                ExecutionState::Idle => (ExecutionState::Cancelled, CancelOutcome::Cancelled),
                ExecutionState::Running if self.period.is_some() => (
                    ExecutionState::CancelledRunning,
                    CancelOutcome::NextRunsCancelled,
                ),
                ExecutionState::Running => return CancelOutcome::Running,
                ExecutionState::Finished => return CancelOutcome::AlreadyExecuted,
                ExecutionState::Cancelled | ExecutionState::CancelledRunning => {
                    return CancelOutcome::AlreadyCancelled;
                }
            };
            if self.transition(current, next) {
                return outcome;
            }
        }
    }

    fn execution_state(&self) -> ExecutionState {
        ExecutionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn is_repeating(&self) -> bool {
        self.period.is_some()
    }

    fn lane(&self) -> Lane {
        self.lane
    }
}

impl fmt::Debug for TickTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickTask")
            .field("lane", &self.lane)
            .field("period", &self.period)
            .field("next_due", &self.next_due.load(Ordering::Relaxed))
            .field("state", &self.execution_state())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

/// What one call to [`TickScheduler::tick`] did.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct TickReport {
    /// Tick number that just ran (first tick is 1).
    pub tick: u64,
    /// Tasks run on the global lane.
    pub global: usize,
    /// Tasks run on region lanes.
    pub region: usize,
    /// Distinct regions that had work.
    pub regions: usize,
    /// Tasks run on the async lane.
    pub background: usize,
}

impl TickReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.global + self.region + self.background
    }
}

/// Reference region-parallel host driven one tick at a time.
pub struct TickScheduler {
    privileged: ThreadId,
    tick_duration: Duration,
    current_tick: AtomicU64,
    pending: Mutex<Vec<Arc<TickTask>>>,
    worlds: WorldList,
    pool: rayon::ThreadPool,
    shut_down: AtomicBool,
}

impl TickScheduler {
    /// Create a host with `threads` region workers. The calling thread becomes
    /// the privileged thread.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("region-worker-{i}"))
            .build()?;

        Ok(Self {
            privileged: thread::current().id(),
            tick_duration: TICK_DURATION,
            current_tick: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            worlds: WorldList::new(),
            pool,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Override the wall-clock length of a tick used for async delays.
    #[must_use]
    pub fn with_tick_duration(mut self, tick: Duration) -> Self {
        self.tick_duration = tick;
        self
    }

    /// Loaded worlds.
    #[must_use]
    pub fn world_list(&self) -> &WorldList {
        &self.worlds
    }

    /// Convenience for `world_list().load(..)`.
    pub fn load_world(&self, world: WorldId, spawn: BlockPos) {
        self.worlds.load(world, spawn);
        debug!(%world, ?spawn, "world loaded");
    }

    /// Returns whether the world was loaded. Queued region tasks for it still
    /// run; new ones are refused.
    pub fn unload_world(&self, world: WorldId) -> bool {
        let unloaded = self.worlds.unload(world);
        if unloaded {
            debug!(%world, "world unloaded");
        }
        unloaded
    }

    /// Last completed tick.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Acquire)
    }

    /// Tasks waiting for a future tick.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    fn submit(
        &self,
        job: Job,
        lane: Lane,
        delay: u64,
        period: Option<u64>,
    ) -> Result<TaskRef, ScheduleError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ScheduleError::ShutDown);
        }
        if delay == 0 {
            return Err(ScheduleError::InvalidDelay(delay));
        }
        if period == Some(0) {
            return Err(ScheduleError::InvalidPeriod(0));
        }
        if let Lane::Region(key) = lane {
            if !self.worlds.contains(key.world) {
                return Err(ScheduleError::UnknownWorld(key.world));
            }
        }

        let due = self.current_tick().saturating_add(delay);
        let task = Arc::new(TickTask::new(job, lane, due, period));
        self.pending.lock().push(Arc::clone(&task));
        trace!(%lane, due, ?period, "task queued");
        Ok(task as TaskRef)
    }

    /// Advance one tick, running every task that is due.
    ///
    /// Blocks until all of this tick's work has finished.
    pub fn tick(&self) -> TickReport {
        let now = self.current_tick.fetch_add(1, Ordering::AcqRel) + 1;

        let due = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            pending.retain(|task| {
                if task.is_cancelled() {
                    return false;
                }
                if task.next_due.load(Ordering::Acquire) <= now {
                    due.push(Arc::clone(task));
                    return false;
                }
                true
            });
            due
        };

        let mut global = Vec::new();
        let mut background = Vec::new();
        let mut regions: HashMap<RegionKey, Vec<Arc<TickTask>>> = HashMap::new();
        for task in due {
            match task.lane {
                Lane::Global => global.push(task),
                Lane::Async => background.push(task),
                Lane::Region(key) => regions.entry(key).or_default().push(task),
            }
        }

        let mut report = TickReport {
            tick: now,
            regions: regions.len(),
            ..TickReport::default()
        };

        report.global = global.iter().filter(|task| task.run()).count();

        for color in Color::ALL {
            let buckets: Vec<&Vec<Arc<TickTask>>> = regions
                .iter()
                .filter(|(key, _)| key.color() == color)
                .map(|(_, bucket)| bucket)
                .collect();
            if buckets.is_empty() {
                continue;
            }
            report.region += self.pool.install(|| {
                buckets
                    .par_iter()
                    .map(|bucket| bucket.iter().filter(|task| task.run()).count())
                    .sum::<usize>()
            });
        }

        report.background = self
            .pool
            .install(|| background.par_iter().filter(|task| task.run()).count());

        let requeue: Vec<Arc<TickTask>> = global
            .into_iter()
            .chain(regions.into_values().flatten())
            .chain(background)
            .filter(|task| task.execution_state() == ExecutionState::Idle)
            .collect();
        if !requeue.is_empty() {
            for task in &requeue {
                let period = task.period.unwrap_or(1);
                task.next_due.store(now + period, Ordering::Release);
            }
            self.pending.lock().extend(requeue);
        }

        if report.total() > 0 {
            trace!(?report, "tick complete");
        }
        report
    }

    /// Stop accepting tasks and cancel everything still queued.
    ///
    /// Returns the number of tasks cancelled.
    pub fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::Release);
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        let cancelled = drained
            .iter()
            .filter(|task| task.cancel() == CancelOutcome::Cancelled)
            .count();
        debug!(cancelled, "tick scheduler shut down");
        cancelled
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("current_tick", &self.current_tick())
            .field("pending", &self.pending_len())
            .field("worlds", &self.worlds)
            .finish_non_exhaustive()
    }
}

impl RegionScheduler for TickScheduler {
    fn run_region(&self, anchor: Anchor, job: Job, delay: u64) -> Result<TaskRef, ScheduleError> {
        self.submit(job, Lane::Region(anchor.region()), delay, None)
    }

    fn run_region_at_fixed_rate(
        &self,
        anchor: Anchor,
        job: Job,
        initial: u64,
        period: u64,
    ) -> Result<TaskRef, ScheduleError> {
        self.submit(job, Lane::Region(anchor.region()), initial, Some(period))
    }

    fn run_global(&self, job: Job, delay: u64) -> Result<TaskRef, ScheduleError> {
        self.submit(job, Lane::Global, delay, None)
    }

    fn run_global_at_fixed_rate(
        &self,
        job: Job,
        initial: u64,
        period: u64,
    ) -> Result<TaskRef, ScheduleError> {
        self.submit(job, Lane::Global, initial, Some(period))
    }

    fn run_async(&self, job: Job, delay: Duration) -> Result<TaskRef, ScheduleError> {
        let delay = duration_to_ticks(delay, self.tick_duration);
        self.submit(job, Lane::Async, delay, None)
    }

    fn run_async_at_fixed_rate(
        &self,
        job: Job,
        initial: Duration,
        period: Duration,
    ) -> Result<TaskRef, ScheduleError> {
        let initial = duration_to_ticks(initial, self.tick_duration);
        let period = duration_to_ticks(period, self.tick_duration);
        self.submit(job, Lane::Async, initial, Some(period))
    }
}

impl WorldView for TickScheduler {
    fn is_privileged_thread(&self) -> bool {
        thread::current().id() == self.privileged
    }

    fn worlds(&self) -> Vec<WorldId> {
        self.worlds.ids()
    }

    fn spawn_point(&self, world: WorldId) -> Option<BlockPos> {
        self.worlds.spawn(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Job) {
        let count = Arc::new(AtomicUsize::new(0));
        let job_count = Arc::clone(&count);
        let job: Job = Arc::new(move || {
            job_count.fetch_add(1, Ordering::SeqCst);
        });
        (count, job)
    }

    fn host() -> TickScheduler {
        let host = TickScheduler::new(2).unwrap();
        host.load_world(WorldId(0), BlockPos::new(0, 64, 0));
        host
    }

    #[test]
    fn one_shot_runs_once_after_delay() {
        let host = host();
        let (count, job) = counter();
        let task = host.run_global(job, 3).unwrap();

        host.tick();
        host.tick();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(task.execution_state(), ExecutionState::Idle);

        host.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());

        for _ in 0..5 {
            host.tick();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(host.pending_len(), 0);
    }

    #[test]
    fn zero_delay_and_period_rejected() {
        let host = host();
        let (_, job) = counter();
        assert_eq!(
            host.run_global(Arc::clone(&job), 0).unwrap_err(),
            ScheduleError::InvalidDelay(0)
        );
        assert_eq!(
            host.run_global_at_fixed_rate(job, 1, 0).unwrap_err(),
            ScheduleError::InvalidPeriod(0)
        );
    }

    #[test]
    fn repeating_task_runs_every_period_until_cancelled() {
        let host = host();
        let (count, job) = counter();
        let anchor = Anchor::new(WorldId(0), BlockPos::new(0, 64, 0));
        let task = host.run_region_at_fixed_rate(anchor, job, 1, 2).unwrap();

        for _ in 0..5 {
            host.tick();
        }
        // ticks 1, 3, 5
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert_eq!(task.cancel(), CancelOutcome::Cancelled);
        assert_eq!(task.cancel(), CancelOutcome::AlreadyCancelled);
        for _ in 0..4 {
            host.tick();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(host.pending_len(), 0);
    }

    #[test]
    fn finished_task_reports_already_executed() {
        let host = host();
        let (_, job) = counter();
        let task = host.run_global(job, 1).unwrap();
        host.tick();
        assert_eq!(task.cancel(), CancelOutcome::AlreadyExecuted);
        assert!(!task.is_cancelled());
    }

    #[test]
    fn region_lane_runs_off_privileged_thread() {
        let host = host();
        let privileged = thread::current().id();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let region_seen = Arc::clone(&seen);
        let anchor = Anchor::new(WorldId(0), BlockPos::new(100, 64, -40));
        let region = host
            .run_region(
                anchor,
                Arc::new(move || region_seen.lock().push(("region", thread::current().id()))),
                1,
            )
            .unwrap();
        assert_eq!(region.lane(), Lane::Region(anchor.region()));

        let global_seen = Arc::clone(&seen);
        host.run_global(
            Arc::new(move || global_seen.lock().push(("global", thread::current().id()))),
            1,
        )
        .unwrap();

        let report = host.tick();
        assert_eq!(report.global, 1);
        assert_eq!(report.region, 1);
        assert_eq!(report.regions, 1);

        for (lane, thread_id) in seen.lock().iter() {
            match *lane {
                "global" => assert_eq!(*thread_id, privileged),
                _ => assert_ne!(*thread_id, privileged),
            }
        }
    }

    #[test]
    fn unknown_world_rejected() {
        let host = host();
        let (_, job) = counter();
        let anchor = Anchor::new(WorldId(9), BlockPos::default());
        assert_eq!(
            host.run_region(anchor, job, 1).unwrap_err(),
            ScheduleError::UnknownWorld(WorldId(9))
        );
    }

    #[test]
    fn unloaded_world_refuses_new_region_work() {
        let host = host();
        let (_, job) = counter();
        let anchor = Anchor::new(WorldId(0), BlockPos::new(0, 64, 0));
        assert!(host.unload_world(WorldId(0)));
        assert!(!host.unload_world(WorldId(0)));
        assert!(host.worlds().is_empty());
        assert_eq!(
            host.run_region(anchor, job, 1).unwrap_err(),
            ScheduleError::UnknownWorld(WorldId(0))
        );
    }

    #[test]
    fn async_delay_is_rounded_up_to_ticks() {
        let host = host();
        let (count, job) = counter();
        host.run_async(job, Duration::from_millis(120)).unwrap();

        host.tick();
        host.tick();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        let report = host.tick();
        assert_eq!(report.background, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_task_does_not_escape_tick() {
        fn boom() {
            panic!("boom");
        }

        let host = host();
        host.run_global(Arc::new(boom), 1).unwrap();
        let (count, job) = counter();
        host.run_global(job, 1).unwrap();

        let report = host.tick();
        assert_eq!(report.global, 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_cancels_pending_and_refuses_new_work() {
        let host = host();
        let (count, job) = counter();
        let task = host.run_global(Arc::clone(&job), 2).unwrap();

        assert_eq!(host.shutdown(), 1);
        assert!(task.is_cancelled());
        assert_eq!(
            host.run_global(job, 1).unwrap_err(),
            ScheduleError::ShutDown
        );
        host.tick();
        host.tick();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
