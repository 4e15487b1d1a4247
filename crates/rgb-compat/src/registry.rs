//! Shadow task ids.
//!
//! The layer hands out its own task ids so module code can keep passing
//! plain integers around. Ids come from an atomic counter that starts far
//! above the legacy scheduler's own numbering and are never reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use dashmap::DashMap;
use legacy_scheduler::{ModuleRef, TaskId};
use rgb_tick::{CancelOutcome, TaskRef};

use crate::adapter::cancel_live;

/// Who owns a shadow id and what it runs as on the host.
///
/// Clones share the cancel flag, so a handle built from an entry and the
/// registry always agree on whether the task was cancelled.
#[derive(Debug, Clone)]
pub struct ShadowEntry {
    pub owner: ModuleRef,
    pub task: TaskRef,
    cancelled: Arc<AtomicBool>,
}

impl ShadowEntry {
    #[must_use]
    pub fn new(owner: ModuleRef, task: TaskRef) -> Self {
        Self {
            owner,
            task,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record the cancel and stop the host task from running again.
    ///
    /// A one-shot that is already running still finishes its current run but
    /// reports cancelled from here on.
    pub fn cancel(&self) -> Option<CancelOutcome> {
        self.cancelled.store(true, Ordering::Release);
        cancel_live(&self.task)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire) || self.task.is_cancelled()
    }

    /// Neither cancelled nor a finished one-shot.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_cancelled() && !self.task.is_finished()
    }
}

/// Concurrent map from shadow id to live host task.
#[derive(Debug)]
pub struct ShadowRegistry {
    entries: DashMap<TaskId, ShadowEntry>,
    next_id: AtomicI32,
}

impl ShadowRegistry {
    #[must_use]
    pub fn new(base: TaskId) -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicI32::new(base),
        }
    }

    /// A fresh id, never returned before by this registry.
    pub fn mint(&self) -> TaskId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a host task under a fresh id.
    ///
    /// The returned entry shares its cancel flag with the stored one.
    pub fn insert(&self, owner: ModuleRef, task: TaskRef) -> (TaskId, ShadowEntry) {
        let id = self.mint();
        let entry = ShadowEntry::new(owner, task);
        self.entries.insert(id, entry.clone());
        (id, entry)
    }

    pub fn remove(&self, id: TaskId) -> Option<ShadowEntry> {
        self.entries.remove(&id).map(|(_, entry)| entry)
    }

    pub fn get(&self, id: TaskId) -> Option<ShadowEntry> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove and return every entry owned by `owner`.
    ///
    /// Entries of other owners inserted during the sweep are never touched.
    pub fn drain_owner(&self, owner: &ModuleRef) -> Vec<(TaskId, ShadowEntry)> {
        let ids: Vec<TaskId> = self
            .entries
            .iter()
            .filter(|entry| &entry.value().owner == owner)
            .map(|entry| *entry.key())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.entries.remove_if(&id, |_, entry| &entry.owner == owner))
            .collect()
    }

    /// Drop entries whose host task is cancelled or finished.
    ///
    /// Returns how many were removed.
    pub fn purge_finished(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live();
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_owned_by(&self, owner: &ModuleRef) -> usize {
        self.entries
            .iter()
            .filter(|entry| &entry.value().owner == owner)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use legacy_scheduler::ModuleId;
    use rgb_spatial::{BlockPos, WorldId};
    use rgb_tick::{RegionScheduler, TickScheduler};

    use super::*;

    fn host() -> TickScheduler {
        let host = TickScheduler::new(1).unwrap();
        host.load_world(WorldId(0), BlockPos::default());
        host
    }

    fn task(host: &TickScheduler) -> TaskRef {
        host.run_global(Arc::new(|| {}), 5).unwrap()
    }

    #[test]
    fn ids_start_at_base_and_are_unique_across_threads() {
        let registry = Arc::new(ShadowRegistry::new(1_000_000));
        assert_eq!(registry.mint(), 1_000_000);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (0..500).map(|_| registry.mint()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {id} minted twice");
                assert!(id > 1_000_000);
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn drain_owner_leaves_other_owners() {
        let host = host();
        let registry = ShadowRegistry::new(100);
        let a = ModuleRef::new(ModuleId(1), "a");
        let b = ModuleRef::new(ModuleId(2), "b");

        let (a1, _) = registry.insert(a.clone(), task(&host));
        let (b1, _) = registry.insert(b.clone(), task(&host));
        let (a2, _) = registry.insert(a.clone(), task(&host));

        let drained = registry.drain_owner(&a);
        let mut ids: Vec<_> = drained.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![a1, a2]);

        assert_eq!(registry.count_owned_by(&a), 0);
        assert_eq!(registry.count_owned_by(&b), 1);
        assert!(registry.contains(b1));
    }

    #[test]
    fn purge_keeps_pending_and_drops_done() {
        let host = host();
        let registry = ShadowRegistry::new(100);
        let owner = ModuleRef::new(ModuleId(1), "purge");

        let (soon, _) =
            registry.insert(owner.clone(), host.run_global(Arc::new(|| {}), 1).unwrap());
        let (later, _) = registry.insert(owner.clone(), task(&host));
        let cancelled = task(&host);
        cancelled.cancel();
        let (gone, _) = registry.insert(owner, cancelled);

        host.tick();
        assert!(!registry.get(soon).unwrap().is_live());
        assert!(registry.get(later).unwrap().is_live());

        assert_eq!(registry.purge_finished(), 2);
        assert!(!registry.contains(soon));
        assert!(!registry.contains(gone));
        assert!(registry.contains(later));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn cancel_mid_run_is_remembered() {
        let host = host();
        let registry = Arc::new(ShadowRegistry::new(100));
        let owner = ModuleRef::new(ModuleId(1), "mid-run");

        let slot = Arc::new(AtomicI32::new(0));
        let outcome = Arc::new(parking_lot::Mutex::new(None));
        let (inner_registry, inner_slot, inner_outcome) =
            (Arc::clone(&registry), Arc::clone(&slot), Arc::clone(&outcome));
        let job: TaskRef = host
            .run_global(
                Arc::new(move || {
                    if let Some(entry) = inner_registry.get(inner_slot.load(Ordering::SeqCst)) {
                        *inner_outcome.lock() = entry.cancel();
                    }
                }),
                1,
            )
            .unwrap();
        let (id, stored) = registry.insert(owner, job);
        slot.store(id, Ordering::SeqCst);

        host.tick();
        assert_eq!(*outcome.lock(), Some(CancelOutcome::Running));
        // The host finished the run, but the cancel still counts.
        assert!(stored.task.is_finished());
        assert!(stored.is_cancelled());
        assert!(!registry.get(id).unwrap().is_live());
    }
}
