//! The legacy scheduler trait.

use std::sync::Arc;

use tracing::error;

use crate::call::Call;
use crate::module::ModuleRef;
use crate::task::{DetachedTask, LegacyTaskRef, Runnable, TaskId};

/// Answer to a [`Call`].
#[derive(Debug, Clone)]
pub enum Reply {
    Task(LegacyTaskRef),
    TaskId(TaskId),
    Flag(bool),
    Tasks(Vec<LegacyTaskRef>),
    Workers(usize),
    Done,
}

impl Reply {
    fn variant(&self) -> &'static str {
        match self {
            Self::Task(_) => "Task",
            Self::TaskId(_) => "TaskId",
            Self::Flag(_) => "Flag",
            Self::Tasks(_) => "Tasks",
            Self::Workers(_) => "Workers",
            Self::Done => "Done",
        }
    }

    fn mismatch(&self, call: &'static str, expected: &'static str) {
        error!(call, expected, got = self.variant(), "scheduler answered with the wrong reply");
    }

    /// The handle of a handle-returning call, or a detached cancelled task.
    pub fn into_task(self, call: &'static str, owner: &ModuleRef, sync: bool) -> LegacyTaskRef {
        match self {
            Self::Task(task) => task,
            other => {
                other.mismatch(call, "Task");
                Arc::new(DetachedTask::new(-1, owner.clone(), sync))
            }
        }
    }

    /// The id of an id-returning call, or `-1`.
    pub fn into_task_id(self, call: &'static str) -> TaskId {
        match self {
            Self::TaskId(id) => id,
            other => {
                other.mismatch(call, "TaskId");
                -1
            }
        }
    }

    pub fn into_flag(self, call: &'static str) -> bool {
        match self {
            Self::Flag(flag) => flag,
            other => {
                other.mismatch(call, "Flag");
                false
            }
        }
    }

    pub fn into_tasks(self, call: &'static str) -> Vec<LegacyTaskRef> {
        match self {
            Self::Tasks(tasks) => tasks,
            other => {
                other.mismatch(call, "Tasks");
                Vec::new()
            }
        }
    }

    pub fn into_workers(self, call: &'static str) -> usize {
        match self {
            Self::Workers(n) => n,
            other => {
                other.mismatch(call, "Workers");
                0
            }
        }
    }
}

/// Shared reference to a scheduler service.
pub type SchedulerRef = Arc<dyn LegacyScheduler>;

/// A single-context scheduler as extension modules see it.
///
/// Implementors answer [`call`](Self::call); the typed methods are thin
/// wrappers that build the matching [`Call`] and unpack the [`Reply`]. A reply
/// of the wrong kind is logged and turned into the "nothing happened" value
/// for that method, never a panic.
pub trait LegacyScheduler: Send + Sync {
    fn call(&self, call: Call) -> Reply;

    fn run_task(&self, owner: &ModuleRef, job: Runnable) -> LegacyTaskRef {
        let call = Call::RunTask {
            owner: owner.clone(),
            job,
        };
        self.call(call).into_task("run_task", owner, true)
    }

    fn run_task_async(&self, owner: &ModuleRef, job: Runnable) -> LegacyTaskRef {
        let call = Call::RunTaskAsync {
            owner: owner.clone(),
            job,
        };
        self.call(call).into_task("run_task_async", owner, false)
    }

    fn run_task_later(&self, owner: &ModuleRef, job: Runnable, delay: i64) -> LegacyTaskRef {
        let call = Call::RunTaskLater {
            owner: owner.clone(),
            job,
            delay,
        };
        self.call(call).into_task("run_task_later", owner, true)
    }

    fn run_task_later_async(&self, owner: &ModuleRef, job: Runnable, delay: i64) -> LegacyTaskRef {
        let call = Call::RunTaskLaterAsync {
            owner: owner.clone(),
            job,
            delay,
        };
        self.call(call).into_task("run_task_later_async", owner, false)
    }

    fn run_task_timer(
        &self,
        owner: &ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    ) -> LegacyTaskRef {
        let call = Call::RunTaskTimer {
            owner: owner.clone(),
            job,
            delay,
            period,
        };
        self.call(call).into_task("run_task_timer", owner, true)
    }

    fn run_task_timer_async(
        &self,
        owner: &ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    ) -> LegacyTaskRef {
        let call = Call::RunTaskTimerAsync {
            owner: owner.clone(),
            job,
            delay,
            period,
        };
        self.call(call).into_task("run_task_timer_async", owner, false)
    }

    fn schedule_sync_delayed_task(&self, owner: &ModuleRef, job: Runnable, delay: i64) -> TaskId {
        let call = Call::ScheduleSyncDelayed {
            owner: owner.clone(),
            job,
            delay,
        };
        self.call(call).into_task_id("schedule_sync_delayed_task")
    }

    fn schedule_sync_repeating_task(
        &self,
        owner: &ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    ) -> TaskId {
        let call = Call::ScheduleSyncRepeating {
            owner: owner.clone(),
            job,
            delay,
            period,
        };
        self.call(call).into_task_id("schedule_sync_repeating_task")
    }

    fn schedule_async_delayed_task(&self, owner: &ModuleRef, job: Runnable, delay: i64) -> TaskId {
        let call = Call::ScheduleAsyncDelayed {
            owner: owner.clone(),
            job,
            delay,
        };
        self.call(call).into_task_id("schedule_async_delayed_task")
    }

    fn schedule_async_repeating_task(
        &self,
        owner: &ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    ) -> TaskId {
        let call = Call::ScheduleAsyncRepeating {
            owner: owner.clone(),
            job,
            delay,
            period,
        };
        self.call(call).into_task_id("schedule_async_repeating_task")
    }

    fn cancel_task(&self, id: TaskId) {
        match self.call(Call::CancelTask(id)) {
            Reply::Done => {}
            other => other.mismatch("cancel_task", "Done"),
        }
    }

    fn cancel_tasks(&self, owner: &ModuleRef) {
        match self.call(Call::CancelTasks(owner.clone())) {
            Reply::Done => {}
            other => other.mismatch("cancel_tasks", "Done"),
        }
    }

    fn is_currently_running(&self, id: TaskId) -> bool {
        self.call(Call::IsCurrentlyRunning(id))
            .into_flag("is_currently_running")
    }

    fn is_queued(&self, id: TaskId) -> bool {
        self.call(Call::IsQueued(id)).into_flag("is_queued")
    }

    fn pending_tasks(&self) -> Vec<LegacyTaskRef> {
        self.call(Call::PendingTasks).into_tasks("pending_tasks")
    }

    fn active_workers(&self) -> usize {
        self.call(Call::ActiveWorkers).into_workers("active_workers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;

    /// Answers every call with the same reply.
    struct Stubborn(Reply);

    impl LegacyScheduler for Stubborn {
        fn call(&self, _call: Call) -> Reply {
            self.0.clone()
        }
    }

    #[test]
    fn wrong_reply_resolves_to_nothing_happened() {
        let owner = ModuleRef::new(ModuleId(3), "confused");
        let scheduler = Stubborn(Reply::Flag(true));

        let task = scheduler.run_task_later(&owner, Arc::new(|| {}), 5);
        assert!(task.is_cancelled());
        assert_eq!(task.task_id(), -1);
        assert!(task.is_sync());
        assert_eq!(task.owner(), &owner);

        assert_eq!(scheduler.schedule_sync_delayed_task(&owner, Arc::new(|| {}), 1), -1);
        assert!(scheduler.pending_tasks().is_empty());
        assert_eq!(scheduler.active_workers(), 0);

        let scheduler = Stubborn(Reply::Done);
        assert!(!scheduler.is_queued(1));
        assert!(!scheduler.is_currently_running(1));
    }

    #[test]
    fn matching_reply_is_unpacked() {
        let scheduler = Stubborn(Reply::TaskId(42));
        let owner = ModuleRef::new(ModuleId(3), "fine");
        assert_eq!(
            scheduler.schedule_async_repeating_task(&owner, Arc::new(|| {}), 0, 20),
            42
        );
    }
}
