//! Scheduled task references.

use core::fmt;
use std::sync::Arc;

use rgb_spatial::RegionKey;

/// A unit of work. Repeating tasks call it once per period, so it is `Fn`.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// Shared, cancellable handle to a task owned by the host.
pub type TaskRef = Arc<dyn ScheduledTask>;

/// Where a task executes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Lane {
    /// Bound to the thread ticking this region.
    Region(RegionKey),
    /// The privileged thread.
    Global,
    /// A worker thread; delays are wall-clock.
    Async,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(key) => write!(f, "region {key}"),
            Self::Global => f.write_str("global"),
            Self::Async => f.write_str("async"),
        }
    }
}

/// Lifecycle of a scheduled task.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum ExecutionState {
    /// Waiting for its next run.
    Idle = 0,
    /// Currently executing.
    Running = 1,
    /// A one-shot task that has run.
    Finished = 2,
    /// Cancelled while executing; the current run completes, no further runs.
    CancelledRunning = 3,
    /// Cancelled; will not run again.
    Cancelled = 4,
}

impl ExecutionState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Finished,
            3 => Self::CancelledRunning,
            _ => Self::Cancelled,
        }
    }
}

/// Result of a cancellation request.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CancelOutcome {
    /// The task had not started and never will.
    Cancelled,
    /// A repeating task is mid-run; that run completes, later ones are dropped.
    NextRunsCancelled,
    /// A one-shot task is mid-run and cannot be stopped.
    Running,
    /// Somebody cancelled it first.
    AlreadyCancelled,
    /// A one-shot task that already ran.
    AlreadyExecuted,
}

/// A task handed out by a [`RegionScheduler`](crate::RegionScheduler).
pub trait ScheduledTask: Send + Sync + fmt::Debug {
    /// Request cancellation. Never blocks on an in-flight run.
    fn cancel(&self) -> CancelOutcome;

    /// Current lifecycle state.
    fn execution_state(&self) -> ExecutionState;

    /// Whether the task runs more than once.
    fn is_repeating(&self) -> bool;

    /// Lane the task was placed on.
    fn lane(&self) -> Lane;

    /// Cancelled tasks stay cancelled.
    fn is_cancelled(&self) -> bool {
        matches!(
            self.execution_state(),
            ExecutionState::Cancelled | ExecutionState::CancelledRunning
        )
    }

    /// One-shot task that has already run.
    fn is_finished(&self) -> bool {
        self.execution_state() == ExecutionState::Finished
    }
}
