//! Region coloring.
//!
//! Regions are colored on a repeating 3x3 tile. Two regions that touch, even
//! only at a corner, never share a color, so a host may tick every region of
//! one color at the same time and run the colors one after another.

use core::fmt;

use crate::pos::RegionPos;

/// Tile side length.
const TILE: i32 = 3;

/// One of the nine parallel phases of a tick.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Color(u8);

impl Color {
    pub const COUNT: usize = (TILE * TILE) as usize;

    /// Phases in the order a tick runs them.
    pub const ALL: [Self; Self::COUNT] = {
        let mut all = [Self(0); Self::COUNT];
        let mut i = 0;
        while i < Self::COUNT {
            all[i] = Self(i as u8);
            i += 1;
        }
        all
    };

    pub const fn from_region(pos: RegionPos) -> Self {
        let x = pos.x.rem_euclid(TILE);
        let z = pos.z.rem_euclid(TILE);
        Self((z * TILE + x) as u8)
    }

    /// Position in [`Color::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {}", self.0)
    }
}
