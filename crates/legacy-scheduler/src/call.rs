//! Closed set of legacy scheduler operations.

use core::fmt;

use crate::module::ModuleRef;
use crate::task::{Runnable, TaskId};

/// One legacy scheduler operation with its arguments.
///
/// Delays and periods are in ticks and may be zero or negative; what that
/// means is up to the scheduler answering the call.
#[derive(Clone)]
pub enum Call {
    RunTask {
        owner: ModuleRef,
        job: Runnable,
    },
    RunTaskAsync {
        owner: ModuleRef,
        job: Runnable,
    },
    RunTaskLater {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
    },
    RunTaskLaterAsync {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
    },
    RunTaskTimer {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    },
    RunTaskTimerAsync {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    },
    ScheduleSyncDelayed {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
    },
    ScheduleSyncRepeating {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    },
    ScheduleAsyncDelayed {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
    },
    ScheduleAsyncRepeating {
        owner: ModuleRef,
        job: Runnable,
        delay: i64,
        period: i64,
    },
    CancelTask(TaskId),
    CancelTasks(ModuleRef),
    IsCurrentlyRunning(TaskId),
    IsQueued(TaskId),
    PendingTasks,
    ActiveWorkers,
}

/// When a submitted task first runs and whether it repeats.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Timing {
    /// Next opportunity.
    Immediate,
    /// Once, after a delay.
    Delayed,
    /// After a delay, then every period.
    Repeating,
}

/// Which context the caller asked for.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Context {
    Sync,
    Async,
}

/// What the caller gets back from a submission.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Returns {
    Handle,
    Id,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Submission {
    pub timing: Timing,
    pub context: Context,
    pub returns: Returns,
}

/// Discriminator for routing a [`Call`] without looking at its arguments.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CallShape {
    Submit(Submission),
    CancelById,
    CancelByOwner,
    Liveness,
    Passthrough,
}

impl CallShape {
    const fn submit(timing: Timing, context: Context, returns: Returns) -> Self {
        Self::Submit(Submission {
            timing,
            context,
            returns,
        })
    }
}

impl Call {
    #[must_use]
    pub const fn shape(&self) -> CallShape {
        use Context::{Async, Sync};
        use Returns::{Handle, Id};
        use Timing::{Delayed, Immediate, Repeating};

        match self {
            Self::RunTask { .. } => CallShape::submit(Immediate, Sync, Handle),
            Self::RunTaskAsync { .. } => CallShape::submit(Immediate, Async, Handle),
            Self::RunTaskLater { .. } => CallShape::submit(Delayed, Sync, Handle),
            Self::RunTaskLaterAsync { .. } => CallShape::submit(Delayed, Async, Handle),
            Self::RunTaskTimer { .. } => CallShape::submit(Repeating, Sync, Handle),
            Self::RunTaskTimerAsync { .. } => CallShape::submit(Repeating, Async, Handle),
            Self::ScheduleSyncDelayed { .. } => CallShape::submit(Delayed, Sync, Id),
            Self::ScheduleSyncRepeating { .. } => CallShape::submit(Repeating, Sync, Id),
            Self::ScheduleAsyncDelayed { .. } => CallShape::submit(Delayed, Async, Id),
            Self::ScheduleAsyncRepeating { .. } => CallShape::submit(Repeating, Async, Id),
            Self::CancelTask(_) => CallShape::CancelById,
            Self::CancelTasks(_) => CallShape::CancelByOwner,
            Self::IsCurrentlyRunning(_) | Self::IsQueued(_) => CallShape::Liveness,
            Self::PendingTasks | Self::ActiveWorkers => CallShape::Passthrough,
        }
    }

    /// Method name as module authors know it.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunTask { .. } => "run_task",
            Self::RunTaskAsync { .. } => "run_task_async",
            Self::RunTaskLater { .. } => "run_task_later",
            Self::RunTaskLaterAsync { .. } => "run_task_later_async",
            Self::RunTaskTimer { .. } => "run_task_timer",
            Self::RunTaskTimerAsync { .. } => "run_task_timer_async",
            Self::ScheduleSyncDelayed { .. } => "schedule_sync_delayed_task",
            Self::ScheduleSyncRepeating { .. } => "schedule_sync_repeating_task",
            Self::ScheduleAsyncDelayed { .. } => "schedule_async_delayed_task",
            Self::ScheduleAsyncRepeating { .. } => "schedule_async_repeating_task",
            Self::CancelTask(_) => "cancel_task",
            Self::CancelTasks(_) => "cancel_tasks",
            Self::IsCurrentlyRunning(_) => "is_currently_running",
            Self::IsQueued(_) => "is_queued",
            Self::PendingTasks => "pending_tasks",
            Self::ActiveWorkers => "active_workers",
        }
    }

    /// Module the call is made on behalf of, if it names one.
    #[must_use]
    pub const fn owner(&self) -> Option<&ModuleRef> {
        match self {
            Self::RunTask { owner, .. }
            | Self::RunTaskAsync { owner, .. }
            | Self::RunTaskLater { owner, .. }
            | Self::RunTaskLaterAsync { owner, .. }
            | Self::RunTaskTimer { owner, .. }
            | Self::RunTaskTimerAsync { owner, .. }
            | Self::ScheduleSyncDelayed { owner, .. }
            | Self::ScheduleSyncRepeating { owner, .. }
            | Self::ScheduleAsyncDelayed { owner, .. }
            | Self::ScheduleAsyncRepeating { owner, .. }
            | Self::CancelTasks(owner) => Some(owner),
            Self::CancelTask(_)
            | Self::IsCurrentlyRunning(_)
            | Self::IsQueued(_)
            | Self::PendingTasks
            | Self::ActiveWorkers => None,
        }
    }

    /// `(delay, period)` in ticks for submissions. Immediate calls report a
    /// zero delay; one-shot calls report no period.
    #[must_use]
    pub const fn timing(&self) -> Option<(i64, Option<i64>)> {
        match self {
            Self::RunTask { .. } | Self::RunTaskAsync { .. } => Some((0, None)),
            Self::RunTaskLater { delay, .. }
            | Self::RunTaskLaterAsync { delay, .. }
            | Self::ScheduleSyncDelayed { delay, .. }
            | Self::ScheduleAsyncDelayed { delay, .. } => Some((*delay, None)),
            Self::RunTaskTimer { delay, period, .. }
            | Self::RunTaskTimerAsync { delay, period, .. }
            | Self::ScheduleSyncRepeating { delay, period, .. }
            | Self::ScheduleAsyncRepeating { delay, period, .. } => Some((*delay, Some(*period))),
            _ => None,
        }
    }

    /// The runnable of a submission.
    #[must_use]
    pub const fn job(&self) -> Option<&Runnable> {
        match self {
            Self::RunTask { job, .. }
            | Self::RunTaskAsync { job, .. }
            | Self::RunTaskLater { job, .. }
            | Self::RunTaskLaterAsync { job, .. }
            | Self::RunTaskTimer { job, .. }
            | Self::RunTaskTimerAsync { job, .. }
            | Self::ScheduleSyncDelayed { job, .. }
            | Self::ScheduleSyncRepeating { job, .. }
            | Self::ScheduleAsyncDelayed { job, .. }
            | Self::ScheduleAsyncRepeating { job, .. } => Some(job),
            _ => None,
        }
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.name());
        if let Some(owner) = self.owner() {
            s.field("owner", &owner.name());
        }
        if let Some((delay, period)) = self.timing() {
            s.field("delay", &delay);
            if let Some(period) = period {
                s.field("period", &period);
            }
        }
        match self {
            Self::CancelTask(id) | Self::IsCurrentlyRunning(id) | Self::IsQueued(id) => {
                s.field("id", id);
            }
            _ => {}
        }
        s.finish()
    }
}
