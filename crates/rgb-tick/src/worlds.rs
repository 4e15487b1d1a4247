//! Loaded world bookkeeping for the reference host.

use parking_lot::RwLock;
use rgb_spatial::{BlockPos, WorldId};

/// Worlds in load order with their spawn points.
#[derive(Debug, Default)]
pub struct WorldList {
    worlds: RwLock<Vec<(WorldId, BlockPos)>>,
}

impl WorldList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a world, or move the spawn of an already loaded one.
    pub fn load(&self, world: WorldId, spawn: BlockPos) {
        let mut worlds = self.worlds.write();
        match worlds.iter_mut().find(|(id, _)| *id == world) {
            Some(entry) => entry.1 = spawn,
            None => worlds.push((world, spawn)),
        }
    }

    /// Returns whether the world was loaded.
    pub fn unload(&self, world: WorldId) -> bool {
        let mut worlds = self.worlds.write();
        let before = worlds.len();
        worlds.retain(|(id, _)| *id != world);
        worlds.len() != before
    }

    #[must_use]
    pub fn contains(&self, world: WorldId) -> bool {
        self.worlds.read().iter().any(|(id, _)| *id == world)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<WorldId> {
        self.worlds.read().iter().map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn spawn(&self, world: WorldId) -> Option<BlockPos> {
        self.worlds
            .read()
            .iter()
            .find(|(id, _)| *id == world)
            .map(|(_, spawn)| *spawn)
    }
}
