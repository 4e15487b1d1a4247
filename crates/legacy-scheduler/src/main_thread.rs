//! Single-context scheduler: every task runs on whichever thread calls
//! [`MainThreadScheduler::tick`].

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::call::Call;
use crate::module::ModuleRef;
use crate::scheduler::{LegacyScheduler, Reply};
use crate::task::{LegacyTask, LegacyTaskRef, Runnable, TaskId};

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

struct MainTask {
    id: TaskId,
    owner: ModuleRef,
    job: Runnable,
    sync: bool,
    period: Option<u64>,
    next_run: AtomicU64,
    state: AtomicU8,
}

impl MainTask {
    fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn run(&self) {
        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        (self.job)();
        let next = if self.period.is_some() { QUEUED } else { DONE };
        // A cancel during the run wins.
        let _ = self
            .state
            .compare_exchange(RUNNING, next, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl LegacyTask for MainTask {
    fn task_id(&self) -> TaskId {
        self.id
    }

    fn owner(&self) -> &ModuleRef {
        &self.owner
    }

    fn is_sync(&self) -> bool {
        self.sync
    }

    fn is_cancelled(&self) -> bool {
        self.state() == CANCELLED
    }

    fn cancel(&self) {
        let mut current = self.state();
        while current == QUEUED || current == RUNNING {
            match self.state.compare_exchange(
                current,
                CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl fmt::Debug for MainTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainTask")
            .field("id", &self.id)
            .field("owner", &self.owner.name())
            .field("sync", &self.sync)
            .field("period", &self.period)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// The scheduler extension modules were originally written against.
///
/// Ids start at 1. Negative delays mean "next tick" and periods below one
/// tick become one tick. Async tasks run inline like sync ones.
pub struct MainThreadScheduler {
    next_id: AtomicI32,
    current_tick: AtomicU64,
    tasks: Mutex<Vec<Arc<MainTask>>>,
    running: AtomicI32,
}

impl Default for MainThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1),
            current_tick: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
            running: AtomicI32::new(0),
        }
    }

    fn submit(
        &self,
        owner: &ModuleRef,
        job: &Runnable,
        sync: bool,
        delay: i64,
        period: Option<i64>,
    ) -> Arc<MainTask> {
        let delay = delay.max(0) as u64;
        let period = period.map(|p| p.max(1) as u64);
        let task = Arc::new(MainTask {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            owner: owner.clone(),
            job: Arc::clone(job),
            sync,
            period,
            next_run: AtomicU64::new(self.current_tick.load(Ordering::Acquire) + delay + 1),
            state: AtomicU8::new(QUEUED),
        });
        trace!(id = task.id, owner = %owner, delay, ?period, "legacy task queued");
        self.tasks.lock().push(Arc::clone(&task));
        task
    }

    fn find(&self, id: TaskId) -> Option<Arc<MainTask>> {
        self.tasks.lock().iter().find(|task| task.id == id).cloned()
    }

    /// Run every task due this tick on the calling thread.
    ///
    /// Returns how many ran.
    pub fn tick(&self) -> usize {
        let now = self.current_tick.fetch_add(1, Ordering::AcqRel) + 1;
        let due: Vec<Arc<MainTask>> = self
            .tasks
            .lock()
            .iter()
            .filter(|task| task.state() == QUEUED && task.next_run.load(Ordering::Acquire) <= now)
            .cloned()
            .collect();

        for task in &due {
            self.running.fetch_add(1, Ordering::AcqRel);
            task.run();
            self.running.fetch_sub(1, Ordering::AcqRel);
            if let Some(period) = task.period {
                task.next_run.store(now + period, Ordering::Release);
            }
        }

        self.tasks.lock().retain(|task| task.state() == QUEUED || task.state() == RUNNING);
        due.len()
    }

    /// Tasks still waiting to run.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| task.state() == QUEUED)
            .count()
    }
}

impl fmt::Debug for MainThreadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadScheduler")
            .field("current_tick", &self.current_tick.load(Ordering::Relaxed))
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}

impl LegacyScheduler for MainThreadScheduler {
    fn call(&self, call: Call) -> Reply {
        match &call {
            Call::RunTask { owner, job }
            | Call::RunTaskLater { owner, job, .. }
            | Call::RunTaskTimer { owner, job, .. } => {
                let (delay, period) = call.timing().unwrap_or((0, None));
                Reply::Task(self.submit(owner, job, true, delay, period))
            }
            Call::RunTaskAsync { owner, job }
            | Call::RunTaskLaterAsync { owner, job, .. }
            | Call::RunTaskTimerAsync { owner, job, .. } => {
                let (delay, period) = call.timing().unwrap_or((0, None));
                Reply::Task(self.submit(owner, job, false, delay, period))
            }
            Call::ScheduleSyncDelayed { owner, job, .. }
            | Call::ScheduleSyncRepeating { owner, job, .. } => {
                let (delay, period) = call.timing().unwrap_or((0, None));
                Reply::TaskId(self.submit(owner, job, true, delay, period).id)
            }
            Call::ScheduleAsyncDelayed { owner, job, .. }
            | Call::ScheduleAsyncRepeating { owner, job, .. } => {
                let (delay, period) = call.timing().unwrap_or((0, None));
                Reply::TaskId(self.submit(owner, job, false, delay, period).id)
            }
            Call::CancelTask(id) => {
                if let Some(task) = self.find(*id) {
                    task.cancel();
                }
                Reply::Done
            }
            Call::CancelTasks(owner) => {
                let mut cancelled = 0_usize;
                for task in self.tasks.lock().iter().filter(|task| &task.owner == owner) {
                    task.cancel();
                    cancelled += 1;
                }
                debug!(owner = %owner, cancelled, "cancelled legacy tasks");
                Reply::Done
            }
            Call::IsCurrentlyRunning(id) => {
                Reply::Flag(self.find(*id).is_some_and(|task| task.state() == RUNNING))
            }
            Call::IsQueued(id) => {
                Reply::Flag(self.find(*id).is_some_and(|task| task.state() == QUEUED))
            }
            Call::PendingTasks => Reply::Tasks(
                self.tasks
                    .lock()
                    .iter()
                    .filter(|task| task.state() == QUEUED)
                    .map(|task| Arc::clone(task) as LegacyTaskRef)
                    .collect(),
            ),
            Call::ActiveWorkers => {
                Reply::Workers(self.running.load(Ordering::Acquire).max(0) as usize)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::module::ModuleId;

    fn counter() -> (Arc<AtomicUsize>, Runnable) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let scheduler = MainThreadScheduler::new();
        let owner = ModuleRef::new(ModuleId(1), "ids");
        let (_, job) = counter();
        let first = scheduler.schedule_sync_delayed_task(&owner, Arc::clone(&job), 1);
        let second = scheduler.run_task(&owner, job);
        assert_eq!(first, 1);
        assert_eq!(second.task_id(), 2);
        assert!(second.is_sync());
    }

    #[test]
    fn delayed_task_runs_once() {
        let scheduler = MainThreadScheduler::new();
        let owner = ModuleRef::new(ModuleId(1), "once");
        let (count, job) = counter();
        let id = scheduler.schedule_sync_delayed_task(&owner, job, 2);

        assert!(scheduler.is_queued(id));
        scheduler.tick();
        scheduler.tick();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        scheduler.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_queued(id));

        scheduler.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timer_repeats_until_owner_cancelled() {
        let scheduler = MainThreadScheduler::new();
        let owner = ModuleRef::new(ModuleId(1), "timer");
        let (count, job) = counter();
        let task = scheduler.run_task_timer(&owner, job, 0, 2);

        for _ in 0..5 {
            scheduler.tick();
        }
        // ticks 1, 3, 5
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.cancel_tasks(&owner);
        assert!(task.is_cancelled());
        scheduler.tick();
        scheduler.tick();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(scheduler.pending_tasks().is_empty());
    }

    #[test]
    fn cancel_by_id_only_touches_that_task() {
        let scheduler = MainThreadScheduler::new();
        let owner = ModuleRef::new(ModuleId(1), "pair");
        let (count, job) = counter();
        let a = scheduler.schedule_async_delayed_task(&owner, Arc::clone(&job), 0);
        let b = scheduler.schedule_async_delayed_task(&owner, job, 0);

        scheduler.cancel_task(a);
        assert!(!scheduler.is_queued(a));
        assert!(scheduler.is_queued(b));
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active_workers(), 0);
    }
}
