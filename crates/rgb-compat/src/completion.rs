//! Waiting on a value computed by a scheduled task.

use core::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use rgb_tick::{Lane, ScheduleError, ScheduledTask};

use crate::adapter::{Placement, cancel_live};
use crate::error::CompletionError;

/// Result of a task scheduled through
/// [`SchedulerAdapter::call_at`](crate::SchedulerAdapter::call_at) or
/// [`call_global`](crate::SchedulerAdapter::call_global).
///
/// Blocking on a completion from the thread that drives the host deadlocks;
/// wait from another thread or poll with [`try_take`](Self::try_take).
pub struct Completion<T> {
    rx: Receiver<T>,
    task: Option<Weak<dyn ScheduledTask>>,
    lane: Option<Lane>,
    failure: Option<ScheduleError>,
}

impl<T> Completion<T> {
    pub(crate) fn channel() -> (Sender<T>, Self) {
        let (tx, rx) = bounded(1);
        let completion = Self {
            rx,
            task: None,
            lane: None,
            failure: None,
        };
        (tx, completion)
    }

    pub(crate) fn placed(mut self, placement: &Placement) -> Self {
        self.task = Some(Arc::downgrade(&placement.task));
        self.lane = Some(placement.lane);
        self
    }

    pub(crate) fn failed(mut self, err: ScheduleError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Lane the task was placed on, `None` if it was never scheduled.
    #[must_use]
    pub fn lane(&self) -> Option<Lane> {
        self.lane
    }

    /// Ask the host not to run the task. No effect once it has run.
    pub fn cancel(&self) {
        if let Some(task) = self.task.as_ref().and_then(Weak::upgrade) {
            cancel_live(&task);
        }
    }

    fn check(&self) -> Result<(), CompletionError> {
        match &self.failure {
            Some(err) => Err(CompletionError::Schedule(err.clone())),
            None => Ok(()),
        }
    }

    /// Block until the task has run.
    pub fn wait(self) -> Result<T, CompletionError> {
        self.check()?;
        self.rx.recv().map_err(|_| CompletionError::Dropped)
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, CompletionError> {
        self.check()?;
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => CompletionError::Timeout,
            RecvTimeoutError::Disconnected => CompletionError::Dropped,
        })
    }

    /// The value, if the task has already run.
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("lane", &self.lane)
            .field("ready", &!self.rx.is_empty())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
