//! Tick-based execution with RGB spatial parallelism.
//!
//! This crate is the host side of region-parallel scheduling. It defines what
//! a host offers ([`RegionScheduler`] + [`WorldView`]) and ships
//! [`TickScheduler`], a tick-driven host used by the runner and the tests.
//!
//! # Lanes
//!
//! Every scheduled task lives on exactly one [`Lane`]:
//! - `Region(key)`: runs on whichever thread ticks that region
//! - `Global`: runs on the privileged thread, which owns world listing state
//! - `Async`: runs on a worker, delays measured in wall-clock time
//!
//! # Tick Execution Model
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Phase 1: Collect due tasks (single lock, then released)    │
//! │  Phase 2: Run GLOBAL lane inline on the privileged thread   │
//! │  Phase 3: For each of the 9 colors, run that color's        │
//! │           region buckets in parallel, barrier between       │
//! │  Phase 4: Run due ASYNC tasks on the worker pool            │
//! │  Phase 5: Requeue repeating tasks that are still live       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod error;
mod host;
mod scheduler;
mod task;
mod ticks;
mod worlds;

pub use error::ScheduleError;
pub use host::{Host, RegionScheduler, WorldView};
pub use scheduler::{TickReport, TickScheduler};
pub use task::{CancelOutcome, ExecutionState, Job, Lane, ScheduledTask, TaskRef};
pub use ticks::{TICK_DURATION, at_least_one_tick, duration_to_ticks, ticks_to_duration};
pub use worlds::WorldList;
