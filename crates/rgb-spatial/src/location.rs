//! Locations, anchors and region keys.

use core::fmt;

use crate::color::Color;
use crate::pos::{BlockPos, RegionPos};

/// Identifier of a loaded world.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, PartialOrd, Ord)]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// A position as supplied by callers. The world may be missing.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Location {
    pub world: Option<WorldId>,
    pub pos: BlockPos,
}

impl Location {
    pub const fn new(world: WorldId, pos: BlockPos) -> Self {
        Self {
            world: Some(world),
            pos,
        }
    }

    /// A location that names no world.
    pub const fn detached(pos: BlockPos) -> Self {
        Self { world: None, pos }
    }

    /// The anchor for this location, if it names a world.
    pub const fn anchor(&self) -> Option<Anchor> {
        match self.world {
            Some(world) => Some(Anchor {
                world,
                pos: self.pos,
            }),
            None => None,
        }
    }
}

/// A location that definitely names a world; picks the region lane a task runs on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Anchor {
    pub world: WorldId,
    pub pos: BlockPos,
}

impl Anchor {
    pub const fn new(world: WorldId, pos: BlockPos) -> Self {
        Self { world, pos }
    }

    pub const fn region(&self) -> RegionKey {
        RegionKey {
            world: self.world,
            region: self.pos.containing_region(),
        }
    }
}

impl From<Anchor> for Location {
    fn from(anchor: Anchor) -> Self {
        Self::new(anchor.world, anchor.pos)
    }
}

/// One independently ticking region of one world.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RegionKey {
    pub world: WorldId,
    pub region: RegionPos,
}

impl RegionKey {
    pub const fn color(&self) -> Color {
        Color::from_region(self.region)
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({}, {})", self.world, self.region.x, self.region.z)
    }
}
