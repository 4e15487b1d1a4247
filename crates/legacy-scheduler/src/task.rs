//! Legacy task handles.

use core::fmt;
use std::sync::Arc;

use crate::module::ModuleRef;

/// Legacy task identifier. Negative values never name a task.
pub type TaskId = i32;

/// Work handed to the scheduler. Repeating tasks call it once per period.
pub type Runnable = Arc<dyn Fn() + Send + Sync>;

/// A task as the legacy surface exposes it.
pub trait LegacyTask: Send + Sync + fmt::Debug {
    fn task_id(&self) -> TaskId;

    fn owner(&self) -> &ModuleRef;

    /// Whether the task was requested on the main context.
    fn is_sync(&self) -> bool;

    /// Once `true`, stays `true`.
    fn is_cancelled(&self) -> bool;

    /// Request that the task never runs again. Safe to call repeatedly.
    fn cancel(&self);
}

pub type LegacyTaskRef = Arc<dyn LegacyTask>;

/// A task that was never scheduled. Always reports cancelled.
#[derive(Debug, Clone)]
pub struct DetachedTask {
    id: TaskId,
    owner: ModuleRef,
    sync: bool,
}

impl DetachedTask {
    #[must_use]
    pub fn new(id: TaskId, owner: ModuleRef, sync: bool) -> Self {
        Self { id, owner, sync }
    }
}

impl LegacyTask for DetachedTask {
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
        true
    }

    fn cancel(&self) {}
}
