//! Default spatial anchor.

use rgb_spatial::Anchor;
use rgb_tick::WorldView;

/// Spawn point of the first loaded world.
///
/// Only the privileged thread may read world state. From any other thread
/// this returns `None` without touching the world list.
pub fn resolve_default_anchor<V: WorldView + ?Sized>(view: &V) -> Option<Anchor> {
    if !view.is_privileged_thread() {
        return None;
    }
    let world = view.worlds().into_iter().next()?;
    let spawn = view.spawn_point(world)?;
    Some(Anchor::new(world, spawn))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rgb_spatial::{BlockPos, WorldId};

    use super::*;

    struct FakeView {
        privileged: bool,
        worlds: Vec<(WorldId, BlockPos)>,
        reads: AtomicUsize,
    }

    impl WorldView for FakeView {
        fn is_privileged_thread(&self) -> bool {
            self.privileged
        }

        fn worlds(&self) -> Vec<WorldId> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.worlds.iter().map(|(id, _)| *id).collect()
        }

        fn spawn_point(&self, world: WorldId) -> Option<BlockPos> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.worlds
                .iter()
                .find(|(id, _)| *id == world)
                .map(|(_, pos)| *pos)
        }
    }

    fn view(privileged: bool) -> FakeView {
        FakeView {
            privileged,
            worlds: vec![
                (WorldId(2), BlockPos::new(10, 70, -4)),
                (WorldId(1), BlockPos::new(0, 64, 0)),
            ],
            reads: AtomicUsize::new(0),
        }
    }

    #[test]
    fn first_world_spawn_on_privileged_thread() {
        let view = view(true);
        assert_eq!(
            resolve_default_anchor(&view),
            Some(Anchor::new(WorldId(2), BlockPos::new(10, 70, -4)))
        );
    }

    #[test]
    fn other_threads_never_read_world_state() {
        let view = view(false);
        for _ in 0..10 {
            assert_eq!(resolve_default_anchor(&view), None);
        }
        assert_eq!(view.reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_worlds_no_anchor() {
        let mut view = view(true);
        view.worlds.clear();
        assert_eq!(resolve_default_anchor(&view), None);
    }
}
