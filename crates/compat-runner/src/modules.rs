//! Demo extension modules.
//!
//! These only know the legacy scheduler API. They have no idea whether the
//! scheduler they get is the original or the compatibility proxy.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

use legacy_scheduler::{LegacyScheduler, ModuleId, ModuleRef, Phase, SchedulerRef, TaskId};
use tracing::{debug, info};

/// Something the host can load.
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called while the module is still `Loading`.
    fn on_load(&self, _module: &ModuleRef, _scheduler: &SchedulerRef) {}

    fn on_enable(&self, module: &ModuleRef, scheduler: &SchedulerRef);
}

/// Loaded modules in load order.
pub struct ModuleHost {
    scheduler: SchedulerRef,
    loaded: Vec<(ModuleRef, Box<dyn Extension>)>,
}

impl ModuleHost {
    pub fn new(scheduler: SchedulerRef) -> Self {
        Self {
            scheduler,
            loaded: Vec::new(),
        }
    }

    pub fn load(&mut self, extension: Box<dyn Extension>) {
        let id = ModuleId(self.loaded.len() as u32 + 1);
        let module = ModuleRef::new(id, extension.name());

        extension.on_load(&module, &self.scheduler);
        module.set_phase(Phase::Enabled);
        extension.on_enable(&module, &self.scheduler);
        info!("Enabled module {} ({})", module, id);

        self.loaded.push((module, extension));
    }

    pub fn names(&self) -> Vec<&str> {
        self.loaded.iter().map(|(module, _)| module.name()).collect()
    }

    /// Disable every module and cancel its tasks, newest first.
    pub fn disable_all(&mut self) {
        for (module, _) in self.loaded.drain(..).rev() {
            module.set_phase(Phase::Disabled);
            self.scheduler.cancel_tasks(&module);
            info!("Disabled module {}", module);
        }
    }
}

/// Periodic save, plus a warm-up scheduled during its own load.
pub struct Autosave {
    pub every: i64,
}

impl Extension for Autosave {
    fn name(&self) -> &'static str {
        "autosave"
    }

    fn on_load(&self, module: &ModuleRef, scheduler: &SchedulerRef) {
        let id = scheduler.schedule_sync_delayed_task(
            module,
            Arc::new(|| info!("Autosave warm-up done")),
            1,
        );
        debug!(id, "autosave warm-up queued during load");
    }

    fn on_enable(&self, module: &ModuleRef, scheduler: &SchedulerRef) {
        let saves = Arc::new(AtomicU64::new(0));
        scheduler.schedule_sync_repeating_task(
            module,
            Arc::new(move || {
                let n = saves.fetch_add(1, Ordering::Relaxed) + 1;
                info!("Autosave #{} complete", n);
            }),
            self.every,
            self.every,
        );
    }
}

/// Computes weather off the main context, then applies it synchronously.
pub struct Weather;

impl Extension for Weather {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn on_enable(&self, module: &ModuleRef, scheduler: &SchedulerRef) {
        let owner = module.clone();
        let sync = Arc::clone(scheduler);
        let cycle = Arc::new(AtomicU32::new(0));
        scheduler.run_task_timer_async(
            module,
            Arc::new(move || {
                let raining = cycle.fetch_add(1, Ordering::Relaxed).is_multiple_of(3);
                sync.run_task(
                    &owner,
                    Arc::new(move || {
                        debug!(raining, "weather applied");
                    }),
                );
            }),
            0,
            60,
        );
    }
}

/// Announces a few times, then cancels its own timer by id.
pub struct Announcer {
    pub times: u32,
}

impl Extension for Announcer {
    fn name(&self) -> &'static str {
        "announcer"
    }

    fn on_enable(&self, module: &ModuleRef, scheduler: &SchedulerRef) {
        let remaining = Arc::new(AtomicU32::new(self.times));
        let own_id = Arc::new(AtomicI32::new(-1));
        let cancel = Arc::clone(scheduler);
        let id_seen = Arc::clone(&own_id);

        let id: TaskId = scheduler.schedule_sync_repeating_task(
            module,
            Arc::new(move || {
                let left = remaining.fetch_sub(1, Ordering::Relaxed);
                info!("Server announcement ({} left)", left.saturating_sub(1));
                if left <= 1 {
                    cancel.cancel_task(id_seen.load(Ordering::Acquire));
                }
            }),
            20,
            40,
        );
        own_id.store(id, Ordering::Release);

        scheduler.run_task_later(
            module,
            Arc::new(|| info!("Welcome message shown")),
            -5,
        );
    }
}

/// The demo set in load order.
pub fn demo() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(Autosave { every: 100 }),
        Box::new(Weather),
        Box::new(Announcer { times: 3 }),
    ]
}
