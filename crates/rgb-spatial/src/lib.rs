//! RGB Spatial Partitioning
//!
//! Divides each world into regions with a 9-coloring for parallel execution.
//! Same-colored regions never touch (not even diagonally), so every region of
//! one color can tick on its own thread at the same time.
//!
//! ```text
//! block (x, y, z) ──>> 4──> chunk (x, z) ──/ REGION_SIZE──> region (x, z) ──> Color
//! ```
//!
//! A [`Location`] is what callers hand in and may lack a world. An [`Anchor`]
//! always names a world and is the only thing a region lane accepts.

pub mod color;
pub mod location;
pub mod pos;

pub use color::Color;
pub use location::{Anchor, Location, RegionKey, WorldId};
pub use pos::{BlockPos, CHUNK_SHIFT, ChunkPos, REGION_SIZE, RegionPos};
