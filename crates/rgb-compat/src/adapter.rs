//! Turns one legacy scheduling intent into one host primitive.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rgb_spatial::{Anchor, Location};
use rgb_tick::{
    CancelOutcome, Host, Job, Lane, ScheduleError, TaskRef, at_least_one_tick, ticks_to_duration,
};
use tracing::{debug, warn};

use crate::anchor::resolve_default_anchor;
use crate::completion::Completion;

/// Where a task ended up.
#[derive(Debug, Clone)]
pub struct Placement {
    pub task: TaskRef,
    pub lane: Lane,
}

impl Placement {
    fn of(task: TaskRef) -> Self {
        Self {
            lane: task.lane(),
            task,
        }
    }
}

/// Normalized tick timing.
#[derive(Copy, Clone, Debug)]
enum Timing {
    Once(u64),
    Repeating { initial: u64, period: u64 },
}

impl Timing {
    const fn once(delay: i64) -> Self {
        Self::Once(at_least_one_tick(delay))
    }

    /// Period is clamped on its own, independent of the initial delay.
    const fn repeating(initial: i64, period: i64) -> Self {
        Self::Repeating {
            initial: at_least_one_tick(initial),
            period: at_least_one_tick(period),
        }
    }
}

/// Cancel a host task unless it already is.
pub fn cancel_live(task: &TaskRef) -> Option<CancelOutcome> {
    if task.is_cancelled() {
        return None;
    }
    Some(task.cancel())
}

/// Maps legacy delays, periods and locations onto the host's lanes.
///
/// Delays and periods are legacy ticks; anything below one tick is treated
/// as one tick. Lane fallbacks are logged and never surface as errors; only
/// the host refusing the final primitive does.
pub struct SchedulerAdapter {
    host: Arc<dyn Host>,
    tick_duration: Duration,
}

impl SchedulerAdapter {
    pub fn new(host: Arc<dyn Host>, tick_duration: Duration) -> Self {
        Self {
            host,
            tick_duration,
        }
    }

    #[must_use]
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Spawn of the first loaded world, on the privileged thread only.
    #[must_use]
    pub fn default_anchor(&self) -> Option<Anchor> {
        resolve_default_anchor(&*self.host)
    }

    fn on_region(
        &self,
        anchor: Anchor,
        job: Job,
        timing: Timing,
    ) -> Result<TaskRef, ScheduleError> {
        match timing {
            Timing::Once(delay) => self.host.run_region(anchor, job, delay),
            Timing::Repeating { initial, period } => {
                self.host
                    .run_region_at_fixed_rate(anchor, job, initial, period)
            }
        }
    }

    fn on_global(&self, job: Job, timing: Timing) -> Result<TaskRef, ScheduleError> {
        match timing {
            Timing::Once(delay) => self.host.run_global(job, delay),
            Timing::Repeating { initial, period } => {
                self.host.run_global_at_fixed_rate(job, initial, period)
            }
        }
    }

    fn on_async(&self, job: Job, timing: Timing) -> Result<TaskRef, ScheduleError> {
        match timing {
            Timing::Once(delay) => self
                .host
                .run_async(job, ticks_to_duration(delay, self.tick_duration)),
            Timing::Repeating { initial, period } => self.host.run_async_at_fixed_rate(
                job,
                ticks_to_duration(initial, self.tick_duration),
                ticks_to_duration(period, self.tick_duration),
            ),
        }
    }

    /// Default anchor if there is one, async lane otherwise.
    fn anywhere(&self, job: Job, timing: Timing) -> Result<Placement, ScheduleError> {
        let Some(anchor) = self.default_anchor() else {
            debug!(?timing, "no default anchor, using async lane");
            return self.on_async(job, timing).map(Placement::of);
        };

        match self.on_region(anchor, Arc::clone(&job), timing) {
            Err(ScheduleError::UnknownWorld(world)) => {
                warn!(%world, "default anchor world vanished, using async lane");
                self.on_async(job, timing).map(Placement::of)
            }
            placed => placed.map(Placement::of),
        }
    }

    /// Region owning `location`, global lane if that cannot be used.
    fn at(
        &self,
        location: &Location,
        job: Job,
        timing: Timing,
    ) -> Result<Placement, ScheduleError> {
        let Some(anchor) = location.anchor() else {
            warn!(pos = ?location.pos, "location has no world, using global lane");
            return self.on_global(job, timing).map(Placement::of);
        };

        match self.on_region(anchor, Arc::clone(&job), timing) {
            Err(ScheduleError::UnknownWorld(world)) => {
                warn!(%world, pos = ?anchor.pos, "location world is not loaded, using global lane");
                self.on_global(job, timing).map(Placement::of)
            }
            placed => placed.map(Placement::of),
        }
    }

    /// Run once after `delay` ticks, at the default anchor when it resolves.
    pub fn schedule_once(&self, job: Job, delay: i64) -> Result<Placement, ScheduleError> {
        self.anywhere(job, Timing::once(delay))
    }

    /// Run every `period` ticks after `initial`, at the default anchor when it
    /// resolves.
    pub fn schedule_repeating(
        &self,
        job: Job,
        initial: i64,
        period: i64,
    ) -> Result<Placement, ScheduleError> {
        self.anywhere(job, Timing::repeating(initial, period))
    }

    /// Run on the region owning `location` at the next opportunity.
    pub fn schedule_at(&self, job: Job, location: &Location) -> Result<Placement, ScheduleError> {
        self.at(location, job, Timing::once(1))
    }

    pub fn schedule_at_delayed(
        &self,
        job: Job,
        location: &Location,
        delay: i64,
    ) -> Result<Placement, ScheduleError> {
        self.at(location, job, Timing::once(delay))
    }

    pub fn schedule_at_fixed_rate(
        &self,
        job: Job,
        location: &Location,
        initial: i64,
        period: i64,
    ) -> Result<Placement, ScheduleError> {
        self.at(location, job, Timing::repeating(initial, period))
    }

    /// Cancel a task placed by this adapter. Already cancelled tasks are left
    /// alone and yield `None`.
    pub fn cancel(&self, task: &TaskRef) -> Option<CancelOutcome> {
        cancel_live(task)
    }

    /// Run `f` on the region owning `location` and hand back its result.
    pub fn call_at<T, F>(&self, location: &Location, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (job, completion) = once_job(f);
        match self.schedule_at(job, location) {
            Ok(placement) => completion.placed(&placement),
            Err(err) => completion.failed(err),
        }
    }

    /// Run `f` on the global lane and hand back its result.
    pub fn call_global<T, F>(&self, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (job, completion) = once_job(f);
        match self.on_global(job, Timing::once(1)) {
            Ok(task) => completion.placed(&Placement::of(task)),
            Err(err) => completion.failed(err),
        }
    }
}

/// Wrap a one-shot closure as a [`Job`] that reports into a [`Completion`].
fn once_job<T, F>(f: F) -> (Job, Completion<T>)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, completion) = Completion::channel();
    let slot = Mutex::new(Some((f, tx)));
    let job: Job = Arc::new(move || {
        // The sender goes down with `f` if it panics.
        let taken = slot.lock().take();
        if let Some((f, tx)) = taken {
            let _ = tx.send(f());
        }
    });
    (job, completion)
}

impl fmt::Debug for SchedulerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerAdapter")
            .field("tick_duration", &self.tick_duration)
            .finish_non_exhaustive()
    }
}
