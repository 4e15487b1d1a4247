//! The legacy scheduling surface.
//!
//! Extension modules were written against a scheduler that runs everything on
//! one main loop. This crate models that surface so a host can keep offering
//! it after the main loop is gone:
//!
//! - [`LegacyScheduler`]: every operation is a [`Call`] answered by a
//!   [`Reply`]; the familiar typed methods are provided on top of `call`
//! - [`ModuleRef`]: who made a call and whether it finished loading
//! - [`SchedulerSlot`]: where the host keeps its scheduler service, and the
//!   only supported way to replace it
//! - [`MainThreadScheduler`]: a plain single-context implementation
//!
//! ```text
//! module code ──typed helper──▶ Call ──▶ LegacyScheduler::call ──▶ Reply
//! ```

mod call;
mod main_thread;
mod module;
mod scheduler;
mod slot;
mod task;

pub use call::{Call, CallShape, Context, Returns, Submission, Timing};
pub use main_thread::MainThreadScheduler;
pub use module::{ModuleId, ModuleRef, Phase};
pub use scheduler::{LegacyScheduler, Reply, SchedulerRef};
pub use slot::{SchedulerSlot, ServiceSlot, SlotError, SlotSwap};
pub use task::{DetachedTask, LegacyTask, LegacyTaskRef, Runnable, TaskId};
