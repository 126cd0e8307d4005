use rustc_hash::FxHashSet;

use crate::biome::BiomeId;
use crate::block::BlockId;
use crate::column::Column;
use crate::coords::{BlockCoord, Boundary, RegionPos};
use crate::heightmap::Heightmap;
use crate::version::GameVersion;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeightmapKind {
    /// Any non-air block, liquids included.
    SolidBlocks,
    SolidBlocksNoLiquid,
}

impl HeightmapKind {
    fn accepts(self, block: BlockId) -> bool {
        match self {
            HeightmapKind::SolidBlocks => !block.is_air(),
            HeightmapKind::SolidBlocksNoLiquid => !block.is_air() && !block.is_liquid(),
        }
    }
}

/// Read-only access to a voxel world.
///
/// This is the only handle region passes receive, which is what lets them run in parallel.
pub trait WorldView: Sync {
    fn bounds(&self) -> Boundary;

    fn min_y(&self) -> i32;

    fn max_y(&self) -> i32;

    /// The fill block used by the base terrain, usually stone.
    fn default_block(&self) -> BlockId;

    /// `None` when the position lies outside the stored volume.
    fn get_block(&self, pos: BlockCoord) -> Option<BlockId>;

    fn get_biome(&self, x: i32, z: i32) -> Option<BiomeId>;

    /// Y of the highest block matching `kind`, or `min_y() - 1` for an empty column.
    fn highest_block(&self, x: i32, z: i32, kind: HeightmapKind) -> i32;

    fn regions(&self) -> Vec<RegionPos>;

    fn is_air_or_null(&self, pos: BlockCoord) -> bool {
        self.get_block(pos).map_or(true, BlockId::is_air)
    }

    fn is_air_not_null(&self, pos: BlockCoord) -> bool {
        self.get_block(pos) == Some(BlockId::AIR)
    }

    fn is_default_block(&self, pos: BlockCoord) -> bool {
        self.get_block(pos) == Some(self.default_block())
    }

    fn heightmap(&self, bounds: Boundary, kind: HeightmapKind) -> Heightmap {
        Heightmap::from_fn(bounds, |x, z| self.highest_block(x, z, kind))
    }
}

/// Mutable access used by the sequential block and surface passes.
pub trait VoxelWorld: WorldView {
    /// Returns `false` when the position lies outside the stored volume.
    fn set_block(&mut self, pos: BlockCoord, block: BlockId) -> bool;

    fn set_biome(&mut self, x: i32, z: i32, biome: BiomeId) -> bool;

    /// Queues a position for the simulation to evaluate once the world is loaded.
    fn mark_for_tick_update(&mut self, pos: BlockCoord);

    /// Splits the storage into disjoint bands of `width` columns along X.
    fn x_bands_mut(&mut self, width: usize) -> Vec<ColumnBand<'_>>;
}

/// A mutable band of whole columns. Bands never share a column.
pub struct ColumnBand<'a> {
    pub x_min: i32,
    pub z_min: i32,
    pub min_y: i32,
    len_z: usize,
    columns: &'a mut [Column],
}

impl<'a> ColumnBand<'a> {
    pub fn len_x(&self) -> usize {
        self.columns.len() / self.len_z
    }

    pub fn len_z(&self) -> usize {
        self.len_z
    }

    pub fn column_mut(&mut self, lx: usize, lz: usize) -> &mut Column {
        &mut self.columns[lx * self.len_z + lz]
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> bool {
        if y < self.min_y {
            return false;
        }
        let lx = (x - self.x_min) as usize;
        let lz = (z - self.z_min) as usize;
        let ly = (y - self.min_y) as usize;
        self.column_mut(lx, lz).set(ly, block)
    }
}

/// Dense in-memory voxel world covering a boundary.
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    bounds: Boundary,
    min_y: i32,
    max_y: i32,
    default_block: BlockId,
    columns: Vec<Column>,
    pending_ticks: Vec<BlockCoord>,
    pending_set: FxHashSet<BlockCoord>,
}

impl MemoryWorld {
    pub fn new(bounds: Boundary, version: GameVersion, biome: BiomeId) -> Self {
        Self::with_limits(bounds, version.floor(), version.ceiling(), biome)
    }

    pub fn with_limits(bounds: Boundary, min_y: i32, max_y: i32, biome: BiomeId) -> Self {
        assert!(min_y <= max_y, "invalid build limits {min_y}..{max_y}");
        let height = (max_y - min_y + 1) as usize;
        let columns = (0..bounds.len_x() * bounds.len_z())
            .map(|_| Column::new_empty(height, biome))
            .collect();
        Self {
            bounds,
            min_y,
            max_y,
            default_block: BlockId::STONE,
            columns,
            pending_ticks: Vec::new(),
            pending_set: FxHashSet::default(),
        }
    }

    /// Rebuilds a world from stored columns in x-major order.
    pub fn from_columns(
        bounds: Boundary,
        min_y: i32,
        max_y: i32,
        columns: Vec<Column>,
    ) -> Result<Self, String> {
        let expected = bounds.len_x() * bounds.len_z();
        if columns.len() != expected {
            return Err(format!(
                "expected {expected} columns for {bounds:?}, got {}",
                columns.len()
            ));
        }
        let height = (max_y - min_y + 1) as usize;
        if let Some(bad) = columns.iter().find(|c| c.height() != height) {
            return Err(format!(
                "column height {} does not match build limits {min_y}..{max_y}",
                bad.height()
            ));
        }
        Ok(Self {
            bounds,
            min_y,
            max_y,
            default_block: BlockId::STONE,
            columns,
            pending_ticks: Vec::new(),
            pending_set: FxHashSet::default(),
        })
    }

    pub fn set_default_block(&mut self, block: BlockId) {
        self.default_block = block;
    }

    pub fn column(&self, x: i32, z: i32) -> Option<&Column> {
        self.bounds.column_index(x, z).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, x: i32, z: i32) -> Option<&mut Column> {
        self.bounds.column_index(x, z).map(|i| &mut self.columns[i])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Positions queued for tick evaluation, in the order they were marked.
    pub fn pending_ticks(&self) -> &[BlockCoord] {
        &self.pending_ticks
    }

    fn local_y(&self, y: i32) -> Option<usize> {
        (self.min_y..=self.max_y)
            .contains(&y)
            .then(|| (y - self.min_y) as usize)
    }
}

impl WorldView for MemoryWorld {
    fn bounds(&self) -> Boundary {
        self.bounds
    }

    fn min_y(&self) -> i32 {
        self.min_y
    }

    fn max_y(&self) -> i32 {
        self.max_y
    }

    fn default_block(&self) -> BlockId {
        self.default_block
    }

    fn get_block(&self, pos: BlockCoord) -> Option<BlockId> {
        let index = self.local_y(pos.y)?;
        self.column(pos.x, pos.z)?.get(index)
    }

    fn get_biome(&self, x: i32, z: i32) -> Option<BiomeId> {
        self.column(x, z).map(|c| c.biome)
    }

    fn highest_block(&self, x: i32, z: i32, kind: HeightmapKind) -> i32 {
        self.column(x, z)
            .and_then(|c| c.highest_matching(|b| kind.accepts(b)))
            .map_or(self.min_y - 1, |index| self.min_y + index as i32)
    }

    fn regions(&self) -> Vec<RegionPos> {
        self.bounds.regions()
    }
}

impl VoxelWorld for MemoryWorld {
    fn set_block(&mut self, pos: BlockCoord, block: BlockId) -> bool {
        let Some(index) = self.local_y(pos.y) else {
            return false;
        };
        match self.column_mut(pos.x, pos.z) {
            Some(column) => column.set(index, block),
            None => false,
        }
    }

    fn set_biome(&mut self, x: i32, z: i32, biome: BiomeId) -> bool {
        match self.column_mut(x, z) {
            Some(column) => {
                column.biome = biome;
                true
            }
            None => false,
        }
    }

    fn mark_for_tick_update(&mut self, pos: BlockCoord) {
        if self.pending_set.insert(pos) {
            self.pending_ticks.push(pos);
        }
    }

    fn x_bands_mut(&mut self, width: usize) -> Vec<ColumnBand<'_>> {
        let width = width.max(1);
        let len_z = self.bounds.len_z();
        let x_min = self.bounds.x_min;
        let z_min = self.bounds.z_min;
        let min_y = self.min_y;
        self.columns
            .chunks_mut(width * len_z)
            .enumerate()
            .map(|(band, columns)| ColumnBand {
                x_min: x_min + (band * width) as i32,
                z_min,
                min_y,
                len_z,
                columns,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{HeightmapKind, MemoryWorld, VoxelWorld, WorldView};
    use crate::biome::BiomeId;
    use crate::block::BlockId;
    use crate::coords::Boundary;
    use crate::version::GameVersion;

    fn small_world() -> MemoryWorld {
        MemoryWorld::new(
            Boundary::from_size(-4, 10, 4, 4),
            GameVersion::release(18),
            BiomeId::Plains,
        )
    }

    #[test]
    fn get_and_set_respect_bounds_and_limits() {
        let mut world = small_world();
        let pos = IVec3::new(-3, -64, 12);
        assert_eq!(world.get_block(pos), Some(BlockId::AIR));
        assert!(world.set_block(pos, BlockId::BEDROCK));
        assert_eq!(world.get_block(pos), Some(BlockId::BEDROCK));

        assert_eq!(world.get_block(IVec3::new(-3, -65, 12)), None);
        assert_eq!(world.get_block(IVec3::new(0, 0, 12)), None);
        assert!(!world.set_block(IVec3::new(0, 0, 12), BlockId::STONE));
        assert!(world.is_air_or_null(IVec3::new(0, 0, 12)));
        assert!(!world.is_air_not_null(IVec3::new(0, 0, 12)));
    }

    #[test]
    fn highest_block_distinguishes_liquids() {
        let mut world = small_world();
        world.set_block(IVec3::new(-4, 10, 10), BlockId::STONE);
        world.set_block(IVec3::new(-4, 11, 10), BlockId::WATER);

        assert_eq!(world.highest_block(-4, 10, HeightmapKind::SolidBlocks), 11);
        assert_eq!(
            world.highest_block(-4, 10, HeightmapKind::SolidBlocksNoLiquid),
            10
        );
        assert_eq!(world.highest_block(-3, 10, HeightmapKind::SolidBlocks), -65);
    }

    #[test]
    fn bands_split_columns_without_overlap() {
        let mut world = MemoryWorld::with_limits(
            Boundary::from_size(0, 0, 5, 3),
            0,
            15,
            BiomeId::Plains,
        );
        {
            let mut bands = world.x_bands_mut(2);
            assert_eq!(bands.len(), 3);
            assert_eq!(bands[0].x_min, 0);
            assert_eq!(bands[2].x_min, 4);
            assert_eq!(bands[2].len_x(), 1);
            for band in &mut bands {
                let x = band.x_min;
                assert!(band.set(x, 3, 1, BlockId::DIRT));
            }
        }
        assert_eq!(world.get_block(IVec3::new(0, 3, 1)), Some(BlockId::DIRT));
        assert_eq!(world.get_block(IVec3::new(2, 3, 1)), Some(BlockId::DIRT));
        assert_eq!(world.get_block(IVec3::new(4, 3, 1)), Some(BlockId::DIRT));
        assert_eq!(world.get_block(IVec3::new(1, 3, 1)), Some(BlockId::AIR));
    }

    #[test]
    fn tick_updates_are_deduplicated_in_order() {
        let mut world = small_world();
        world.mark_for_tick_update(IVec3::new(-4, 0, 10));
        world.mark_for_tick_update(IVec3::new(-3, 0, 10));
        world.mark_for_tick_update(IVec3::new(-4, 0, 10));
        assert_eq!(
            world.pending_ticks(),
            &[IVec3::new(-4, 0, 10), IVec3::new(-3, 0, 10)]
        );
    }
}
