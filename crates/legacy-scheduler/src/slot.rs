//! Where the host keeps its scheduler service.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use thiserror::Error;

use crate::scheduler::SchedulerRef;

/// Why the scheduler slot could not be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// No scheduler has been registered yet.
    #[error("no scheduler service is registered")]
    Empty,

    /// The host no longer allows the service to be replaced.
    #[error("scheduler service slot is sealed")]
    Sealed,
}

/// Outcome of a guarded replacement.
pub enum SlotSwap {
    /// The slot held `expected` and now holds the replacement.
    Swapped,
    /// Someone else's scheduler is in the slot; nothing was written.
    Mismatch { current: SchedulerRef },
}

impl fmt::Debug for SlotSwap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swapped => f.write_str("Swapped"),
            Self::Mismatch { .. } => f.write_str("Mismatch"),
        }
    }
}

/// Host storage for the live scheduler service.
///
/// This is the only thing the compatibility layer knows about host internals.
pub trait SchedulerSlot: Send + Sync {
    /// The scheduler currently in service.
    fn load(&self) -> Result<SchedulerRef, SlotError>;

    /// Replace the scheduler, but only if the slot still holds `expected`
    /// (compared by pointer).
    fn swap_if(
        &self,
        expected: &SchedulerRef,
        replacement: SchedulerRef,
    ) -> Result<SlotSwap, SlotError>;
}

/// In-process service registry slot.
#[derive(Default)]
pub struct ServiceSlot {
    current: RwLock<Option<SchedulerRef>>,
    sealed: AtomicBool,
}

impl ServiceSlot {
    #[must_use]
    pub fn new(scheduler: SchedulerRef) -> Self {
        Self {
            current: RwLock::new(Some(scheduler)),
            sealed: AtomicBool::new(false),
        }
    }

    /// Register a scheduler unconditionally, replacing whatever is there.
    pub fn register(&self, scheduler: SchedulerRef) {
        *self.current.write() = Some(scheduler);
    }

    /// Refuse all further loads and swaps.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn holds(&self, scheduler: &SchedulerRef) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, scheduler))
    }

    fn check(&self) -> Result<(), SlotError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(SlotError::Sealed);
        }
        Ok(())
    }
}

impl SchedulerSlot for ServiceSlot {
    fn load(&self) -> Result<SchedulerRef, SlotError> {
        self.check()?;
        self.current.read().clone().ok_or(SlotError::Empty)
    }

    fn swap_if(
        &self,
        expected: &SchedulerRef,
        replacement: SchedulerRef,
    ) -> Result<SlotSwap, SlotError> {
        self.check()?;
        let mut current = self.current.write();
        match current.as_ref() {
            None => Err(SlotError::Empty),
            Some(live) if Arc::ptr_eq(live, expected) => {
                *current = Some(replacement);
                Ok(SlotSwap::Swapped)
            }
            Some(live) => Ok(SlotSwap::Mismatch {
                current: Arc::clone(live),
            }),
        }
    }
}

impl fmt::Debug for ServiceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSlot")
            .field("registered", &self.current.read().is_some())
            .field("sealed", &self.sealed.load(Ordering::Relaxed))
            .finish()
    }
}
