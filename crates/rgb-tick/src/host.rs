//! What a region-parallel host offers.

use std::time::Duration;

use rgb_spatial::{Anchor, BlockPos, WorldId};

use crate::error::ScheduleError;
use crate::task::{Job, TaskRef};

/// Region-parallel scheduling primitives.
///
/// Tick counts must be at least 1; hosts reject anything lower with
/// [`ScheduleError::InvalidDelay`] / [`ScheduleError::InvalidPeriod`].
pub trait RegionScheduler: Send + Sync {
    /// Run once on the region owning `anchor`, after `delay` ticks.
    fn run_region(&self, anchor: Anchor, job: Job, delay: u64) -> Result<TaskRef, ScheduleError>;

    /// Run repeatedly on the region owning `anchor`.
    fn run_region_at_fixed_rate(
        &self,
        anchor: Anchor,
        job: Job,
        initial: u64,
        period: u64,
    ) -> Result<TaskRef, ScheduleError>;

    /// Run once on the global lane, after `delay` ticks.
    fn run_global(&self, job: Job, delay: u64) -> Result<TaskRef, ScheduleError>;

    /// Run repeatedly on the global lane.
    fn run_global_at_fixed_rate(
        &self,
        job: Job,
        initial: u64,
        period: u64,
    ) -> Result<TaskRef, ScheduleError>;

    /// Run once on an async worker after a wall-clock delay.
    fn run_async(&self, job: Job, delay: Duration) -> Result<TaskRef, ScheduleError>;

    /// Run repeatedly on an async worker.
    fn run_async_at_fixed_rate(
        &self,
        job: Job,
        initial: Duration,
        period: Duration,
    ) -> Result<TaskRef, ScheduleError>;
}

/// Read access to global world state.
///
/// `worlds` and `spawn_point` are only safe on the privileged thread.
pub trait WorldView: Send + Sync {
    /// Whether the calling thread owns global state.
    fn is_privileged_thread(&self) -> bool;

    /// Loaded worlds, in load order.
    fn worlds(&self) -> Vec<WorldId>;

    /// Spawn point of a loaded world.
    fn spawn_point(&self, world: WorldId) -> Option<BlockPos>;
}

/// Everything the compatibility layer needs from a host.
pub trait Host: RegionScheduler + WorldView {}

impl<T: RegionScheduler + WorldView> Host for T {}
