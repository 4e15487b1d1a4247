//! Error types for the compatibility layer.

use legacy_scheduler::SlotError;
use rgb_tick::ScheduleError;
use thiserror::Error;

/// Why the compatibility scheduler could not be installed or removed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The host scheduler slot could not be read or written.
    #[error("scheduler slot unavailable: {0}")]
    SlotUnavailable(#[source] SlotError),

    /// The slot changed between reading the original and installing.
    #[error("scheduler slot changed during install")]
    Raced,

    #[error("compatibility scheduler is already installed")]
    AlreadyInstalled,

    #[error("compatibility scheduler is not installed")]
    NotInstalled,

    /// Someone replaced the proxy after install; the slot was left alone.
    #[error("scheduler slot was replaced after install, original not restored")]
    Replaced,
}

/// Why a [`Completion`](crate::Completion) produced no value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("task could not be scheduled: {0}")]
    Schedule(#[from] ScheduleError),

    /// The task was cancelled, panicked or was dropped by the host.
    #[error("task ended without producing a value")]
    Dropped,

    #[error("timed out waiting for task")]
    Timeout,
}
