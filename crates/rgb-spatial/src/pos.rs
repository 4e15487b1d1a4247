/// Blocks per chunk edge, as a shift.
pub const CHUNK_SHIFT: u32 = 4;
/// Chunks per region edge.
pub const REGION_SIZE: i32 = 4;

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, Default)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn containing_chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x >> CHUNK_SHIFT,
            z: self.z >> CHUNK_SHIFT,
        }
    }

    pub const fn containing_region(self) -> RegionPos {
        self.containing_chunk().containing_region()
    }
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn containing_region(self) -> RegionPos {
        RegionPos {
            x: self.x.div_euclid(REGION_SIZE),
            z: self.z.div_euclid(REGION_SIZE),
        }
    }
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_to_chunk() {
        assert_eq!(BlockPos::new(0, 64, 0).containing_chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(15, 64, 15).containing_chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(16, 64, 0).containing_chunk(), ChunkPos::new(1, 0));
        assert_eq!(
            BlockPos::new(-1, 64, -17).containing_chunk(),
            ChunkPos::new(-1, -2)
        );
    }

    #[test]
    fn chunk_to_region() {
        assert_eq!(ChunkPos::new(0, 0).containing_region(), RegionPos::new(0, 0));
        assert_eq!(ChunkPos::new(3, 3).containing_region(), RegionPos::new(0, 0));
        assert_eq!(ChunkPos::new(4, 0).containing_region(), RegionPos::new(1, 0));
        assert_eq!(
            ChunkPos::new(-1, -1).containing_region(),
            RegionPos::new(-1, -1)
        );
    }
}
