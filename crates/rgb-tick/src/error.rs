//! Scheduling error types.

use rgb_spatial::WorldId;
use thiserror::Error;

/// Why a host refused to schedule a task.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Region and global lanes have a one tick granularity.
    #[error("delay must be at least one tick, got {0}")]
    InvalidDelay(u64),

    /// Repeating tasks need a period of at least one tick.
    #[error("period must be at least one tick, got {0}")]
    InvalidPeriod(u64),

    /// The anchor names a world the host does not have loaded.
    #[error("{0} is not loaded")]
    UnknownWorld(WorldId),

    /// The host no longer accepts tasks.
    #[error("scheduler is shut down")]
    ShutDown,
}
