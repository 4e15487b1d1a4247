//! Task handles given to module code.

use core::fmt;

use legacy_scheduler::{LegacyTask, ModuleRef, Runnable, TaskId};
use rgb_tick::TaskRef;

use crate::registry::ShadowEntry;

/// Stands in for a legacy task while the work runs on the host.
///
/// Cancel state lives in the shadow entry, so cancelling through the handle,
/// by id or by owner all look the same from either side.
pub struct CompatTask {
    id: TaskId,
    owner: ModuleRef,
    job: Runnable,
    sync: bool,
    shadow: Option<ShadowEntry>,
}

impl CompatTask {
    pub(crate) fn new(id: TaskId, job: Runnable, sync: bool, shadow: ShadowEntry) -> Self {
        Self {
            id,
            owner: shadow.owner.clone(),
            job,
            sync,
            shadow: Some(shadow),
        }
    }

    /// A handle for work that was never scheduled.
    #[must_use]
    pub const fn cancelled(id: TaskId, owner: ModuleRef, job: Runnable, sync: bool) -> Self {
        Self {
            id,
            owner,
            job,
            sync,
            shadow: None,
        }
    }

    #[must_use]
    pub fn job(&self) -> &Runnable {
        &self.job
    }

    /// The host task backing this handle, if any.
    #[must_use]
    pub fn live(&self) -> Option<&TaskRef> {
        self.shadow.as_ref().map(|shadow| &shadow.task)
    }
}

impl LegacyTask for CompatTask {
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
        self.shadow.as_ref().is_none_or(ShadowEntry::is_cancelled)
    }

    fn cancel(&self) {
        if let Some(shadow) = &self.shadow {
            shadow.cancel();
        }
    }
}

impl fmt::Debug for CompatTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatTask")
            .field("id", &self.id)
            .field("owner", &self.owner.name())
            .field("sync", &self.sync)
            .field("cancelled", &self.is_cancelled())
            .field("live", &self.live())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use legacy_scheduler::ModuleId;
    use rgb_tick::{CancelOutcome, ExecutionState, Lane, ScheduledTask};

    use super::*;

    #[derive(Debug, Default)]
    struct Flag {
        cancels: std::sync::atomic::AtomicUsize,
        cancelled: AtomicBool,
    }

    impl ScheduledTask for Flag {
        fn cancel(&self) -> CancelOutcome {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            if self.cancelled.swap(true, Ordering::SeqCst) {
                CancelOutcome::AlreadyCancelled
            } else {
                CancelOutcome::Cancelled
            }
        }

        fn execution_state(&self) -> ExecutionState {
            if self.cancelled.load(Ordering::SeqCst) {
                ExecutionState::Cancelled
            } else {
                ExecutionState::Idle
            }
        }

        fn is_repeating(&self) -> bool {
            false
        }

        fn lane(&self) -> Lane {
            Lane::Global
        }
    }

    fn owner() -> ModuleRef {
        ModuleRef::new(ModuleId(1), "handles")
    }

    #[test]
    fn double_cancel_is_harmless() {
        let live = Arc::new(Flag::default());
        let shadow = ShadowEntry::new(owner(), live.clone());
        let task = CompatTask::new(1_000_000, Arc::new(|| {}), true, shadow);
        assert!(!task.is_cancelled());

        task.cancel();
        task.cancel();
        assert!(task.is_cancelled());
        assert!(live.is_cancelled());
        // Second cancel sees the host task already cancelled and leaves it.
        assert_eq!(live.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn host_side_cancel_is_visible() {
        let live = Arc::new(Flag::default());
        let shadow = ShadowEntry::new(owner(), live.clone());
        let task = CompatTask::new(7, Arc::new(|| {}), false, shadow);
        live.cancel();
        assert!(task.is_cancelled());
        assert!(!task.is_sync());
    }

    #[test]
    fn placeholder_is_cancelled_from_the_start() {
        let task = CompatTask::cancelled(9, owner(), Arc::new(|| {}), true);
        assert!(task.is_cancelled());
        assert!(task.live().is_none());
        task.cancel();
        assert!(task.is_cancelled());
        assert_eq!(task.task_id(), 9);
    }

    #[test]
    fn handle_and_entry_share_cancel_state() {
        let live = Arc::new(Flag::default());
        let shadow = ShadowEntry::new(owner(), live.clone());
        let task = CompatTask::new(11, Arc::new(|| {}), true, shadow.clone());

        shadow.cancel();
        assert!(task.is_cancelled());
        assert_eq!(live.cancels.load(Ordering::SeqCst), 1);

        let other = ShadowEntry::new(owner(), Arc::new(Flag::default()));
        let handle = CompatTask::new(12, Arc::new(|| {}), true, other.clone());
        handle.cancel();
        assert!(!other.is_live());
    }
}
