//! Legacy scheduler compatibility for region-parallel hosts.
//!
//! Extension modules keep calling what they believe is the single-threaded
//! legacy scheduler. [`SchedulerManager::install`] puts a [`CompatScheduler`]
//! in the host's scheduler slot, and every call is rewritten into a
//! region-bound, global or async task on the host.
//!
//! ```text
//! module ──Call──▶ CompatScheduler ──▶ SchedulerAdapter ──▶ RegionScheduler
//!                    │      │                                    │
//!                    │      └─ ShadowRegistry (id → live task) ◀─┘
//!                    └─ bypass / unknown shapes ──▶ original scheduler
//! ```
//!
//! Failures never reach module code: a call that cannot be adapted returns a
//! cancelled placeholder and logs a warning naming the module.

mod adapter;
mod anchor;
mod completion;
mod config;
mod error;
mod handle;
mod install;
mod proxy;
mod registry;

pub use adapter::{Placement, SchedulerAdapter};
pub use anchor::resolve_default_anchor;
pub use completion::Completion;
pub use config::CompatConfig;
pub use error::{CompletionError, InstallError};
pub use handle::CompatTask;
pub use install::SchedulerManager;
pub use proxy::CompatScheduler;
pub use registry::{ShadowEntry, ShadowRegistry};
