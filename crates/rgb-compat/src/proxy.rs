//! The scheduler module code talks to after install.

use core::fmt;
use std::sync::Arc;

use legacy_scheduler::{
    Call, CallShape, Context, LegacyScheduler, Reply, Returns, SchedulerRef, Submission, Timing,
};
use rgb_spatial::Location;
use tracing::{debug, warn};

use crate::adapter::SchedulerAdapter;
use crate::config::CompatConfig;
use crate::handle::CompatTask;
use crate::registry::ShadowRegistry;

/// Legacy scheduler that runs everything on the region-parallel host.
///
/// Submissions from enabled modules go through the [`SchedulerAdapter`] and
/// are tracked under shadow ids. Everything it does not understand, and
/// everything from modules that are still loading, goes to the original
/// scheduler unchanged.
pub struct CompatScheduler {
    adapter: SchedulerAdapter,
    registry: ShadowRegistry,
    original: SchedulerRef,
    config: CompatConfig,
}

impl CompatScheduler {
    pub fn new(adapter: SchedulerAdapter, original: SchedulerRef, config: CompatConfig) -> Self {
        Self {
            adapter,
            registry: ShadowRegistry::new(config.shadow_id_base),
            original,
            config,
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &SchedulerAdapter {
        &self.adapter
    }

    #[must_use]
    pub fn registry(&self) -> &ShadowRegistry {
        &self.registry
    }

    /// The scheduler this one stands in for.
    #[must_use]
    pub fn original(&self) -> &SchedulerRef {
        &self.original
    }

    #[must_use]
    pub fn config(&self) -> &CompatConfig {
        &self.config
    }

    /// Forget shadow ids whose task was cancelled or has finished.
    pub fn purge_finished(&self) -> usize {
        let removed = self.registry.purge_finished();
        if removed > 0 {
            debug!(removed, remaining = self.registry.len(), "purged finished shadow tasks");
        }
        removed
    }

    fn default_location(&self) -> Location {
        self.adapter
            .default_anchor()
            .map_or_else(Location::default, Location::from)
    }

    fn submit(&self, call: Call, submission: Submission) -> Reply {
        let (Some(owner), Some(job), Some((delay, period))) =
            (call.owner().cloned(), call.job().cloned(), call.timing())
        else {
            return self.original.call(call);
        };

        if self.config.bypass_uninitialized && !owner.is_initialized() {
            debug!(
                module = %owner,
                call = call.name(),
                phase = ?owner.phase(),
                "module not enabled, forwarding to original scheduler"
            );
            return self.original.call(call);
        }

        let sync = submission.context == Context::Sync;
        let placed = match (submission.context, period) {
            (Context::Sync, None) if submission.timing == Timing::Immediate => self
                .adapter
                .schedule_at(Arc::clone(&job), &self.default_location()),
            (Context::Sync, None) => {
                self.adapter
                    .schedule_at_delayed(Arc::clone(&job), &self.default_location(), delay)
            }
            (Context::Sync, Some(period)) => self.adapter.schedule_at_fixed_rate(
                Arc::clone(&job),
                &self.default_location(),
                delay,
                period,
            ),
            (Context::Async, None) => self.adapter.schedule_once(Arc::clone(&job), delay),
            (Context::Async, Some(period)) => {
                self.adapter
                    .schedule_repeating(Arc::clone(&job), delay, period)
            }
        };

        match placed {
            Ok(placement) => {
                let (id, shadow) = self.registry.insert(owner.clone(), placement.task);
                debug!(
                    module = %owner,
                    call = call.name(),
                    id,
                    lane = %placement.lane,
                    "adapted legacy call"
                );
                match submission.returns {
                    Returns::Handle => {
                        Reply::Task(Arc::new(CompatTask::new(id, job, sync, shadow)))
                    }
                    Returns::Id => Reply::TaskId(id),
                }
            }
            Err(err) => {
                let id = self.registry.mint();
                warn!(
                    module = %owner,
                    call = call.name(),
                    id,
                    %err,
                    "could not schedule task, returning a cancelled placeholder"
                );
                match submission.returns {
                    Returns::Handle => {
                        Reply::Task(Arc::new(CompatTask::cancelled(id, owner, job, sync)))
                    }
                    Returns::Id => Reply::TaskId(id),
                }
            }
        }
    }

    /// Cancellation and liveness: shadow ids first, then the original.
    fn shadowed(&self, call: Call) -> Reply {
        match call {
            Call::CancelTask(id) => {
                if let Some(entry) = self.registry.remove(id) {
                    let outcome = entry.cancel();
                    debug!(id, module = %entry.owner, ?outcome, "cancelled shadow task");
                }
                // The id may belong to a task the original scheduler made.
                self.original.call(Call::CancelTask(id));
                Reply::Done
            }
            Call::CancelTasks(owner) => {
                let drained = self.registry.drain_owner(&owner);
                for (_, entry) in &drained {
                    entry.cancel();
                }
                debug!(
                    module = %owner,
                    cancelled = drained.len(),
                    "cancelled shadow tasks of module"
                );
                self.original.call(Call::CancelTasks(owner));
                Reply::Done
            }
            Call::IsCurrentlyRunning(id) | Call::IsQueued(id) => match self.registry.get(id) {
                Some(entry) => Reply::Flag(entry.is_live()),
                None => self.original.call(call),
            },
            other => self.original.call(other),
        }
    }
}

impl LegacyScheduler for CompatScheduler {
    fn call(&self, call: Call) -> Reply {
        match call.shape() {
            CallShape::Submit(submission) => self.submit(call, submission),
            CallShape::CancelById | CallShape::CancelByOwner | CallShape::Liveness => {
                self.shadowed(call)
            }
            CallShape::Passthrough => self.original.call(call),
        }
    }
}

impl fmt::Debug for CompatScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatScheduler")
            .field("shadowed", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
