use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

const CANOPY_RADIUS: i32 = 2;

/// Oak canopy above the bare trunk, indexed `[y][z][x]`. 1 = log, 2 = leaves.
const OAK_CANOPY: [[[u8; 5]; 5]; 5] = [
    [
        [0, 0, 0, 0, 0],
        [0, 0, 2, 0, 0],
        [0, 2, 1, 2, 0],
        [0, 0, 2, 0, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 2, 2, 2, 0],
        [2, 2, 2, 2, 2],
        [2, 2, 1, 2, 2],
        [2, 2, 2, 2, 2],
        [0, 2, 2, 2, 0],
    ],
    [
        [0, 2, 2, 2, 0],
        [2, 2, 2, 2, 2],
        [2, 2, 1, 2, 2],
        [2, 2, 2, 2, 2],
        [0, 2, 2, 2, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 2, 2, 2, 0],
        [0, 2, 1, 2, 0],
        [0, 2, 2, 2, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 0, 2, 0, 0],
        [0, 2, 2, 2, 0],
        [0, 0, 2, 0, 0],
        [0, 0, 0, 0, 0],
    ],
];

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct VegetationOptions {
    grass: f32,
    trees: f32,
}

impl Default for VegetationOptions {
    fn default() -> Self {
        Self {
            grass: 0.2,
            trees: 0.3,
        }
    }
}

/// Scatters oak trees and tall grass over grassy ground.
pub struct VegetationGen {
    grass_chance: f32,
    tree_chance: f32,
}

impl VegetationGen {
    /// `trees` is the expected number of trees per 128 columns.
    pub fn new(grass: f32, trees: f32) -> Self {
        Self {
            grass_chance: grass,
            tree_chance: trees / 128.0,
        }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: VegetationOptions = parse_options("vegetation", table)?;
        Ok(GeneratorKind::Vegetation(Self::new(
            options.grass,
            options.trees,
        )))
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, rng: &mut ChaCha8Rng) {
        let above = pos + IVec3::Y;
        if rng.gen::<f32>() <= self.tree_chance && place_tree(world, above, rng) {
            return;
        }
        if rng.gen::<f32>() <= self.grass_chance {
            place_grass(world, above);
        }
    }
}

fn can_grow_tree(block: BlockId) -> bool {
    block == BlockId::GRASS_BLOCK || block == BlockId::DIRT
}

fn place_tree(world: &mut dyn VoxelWorld, base: IVec3, rng: &mut ChaCha8Rng) -> bool {
    match world.get_block(base - IVec3::Y) {
        Some(ground) if can_grow_tree(ground) => {}
        _ => return false,
    }
    let trunk = rng.gen_range(1..4);
    if !world.is_air_or_null(base + IVec3::Y) {
        return false;
    }

    world.set_block(base - IVec3::Y, BlockId::DIRT);
    for i in 0..=trunk {
        world.set_block(base + IVec3::Y * i, BlockId::OAK_LOG);
    }
    for (ly, layer) in OAK_CANOPY.iter().enumerate() {
        for (lz, row) in layer.iter().enumerate() {
            for (lx, &cell) in row.iter().enumerate() {
                let block = match cell {
                    1 => BlockId::OAK_LOG,
                    2 => BlockId::OAK_LEAVES,
                    _ => continue,
                };
                let offset = IVec3::new(
                    lx as i32 - CANOPY_RADIUS,
                    ly as i32 + trunk + 1,
                    lz as i32 - CANOPY_RADIUS,
                );
                world.set_block(base + offset, block);
            }
        }
    }
    true
}

fn place_grass(world: &mut dyn VoxelWorld, pos: IVec3) -> bool {
    if world.get_block(pos - IVec3::Y) != Some(BlockId::GRASS_BLOCK) {
        return false;
    }
    world.set_block(pos, BlockId::TALL_GRASS)
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::Boundary;
    use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};

    use super::VegetationGen;

    fn meadow() -> MemoryWorld {
        let mut world =
            MemoryWorld::with_limits(Boundary::from_size(-4, -4, 9, 9), 0, 31, BiomeId::Forest);
        for x in -4..=4 {
            for z in -4..=4 {
                world.set_block(IVec3::new(x, 10, z), BlockId::GRASS_BLOCK);
            }
        }
        world
    }

    #[test]
    fn certain_tree_grows_trunk_and_canopy() {
        let mut world = meadow();
        let mut gen = VegetationGen::new(0.0, 128.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        gen.process_surface(&mut world, IVec3::new(0, 10, 0), &mut rng);

        assert_eq!(world.get_block(IVec3::new(0, 10, 0)), Some(BlockId::DIRT));
        assert_eq!(world.get_block(IVec3::new(0, 11, 0)), Some(BlockId::OAK_LOG));
        assert_eq!(world.get_block(IVec3::new(0, 12, 0)), Some(BlockId::OAK_LOG));

        let leaves = (11..=20)
            .flat_map(|y| (-2..=2).flat_map(move |x| (-2..=2).map(move |z| IVec3::new(x, y, z))))
            .filter(|&p| world.get_block(p) == Some(BlockId::OAK_LEAVES))
            .count();
        assert_eq!(leaves, 4 + 20 + 20 + 8 + 5);
    }

    #[test]
    fn grass_only_grows_on_grass_blocks() {
        let mut world = meadow();
        world.set_block(IVec3::new(1, 10, 0), BlockId::SAND);
        let mut gen = VegetationGen::new(1.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        gen.process_surface(&mut world, IVec3::new(0, 10, 0), &mut rng);
        gen.process_surface(&mut world, IVec3::new(1, 10, 0), &mut rng);

        assert_eq!(world.get_block(IVec3::new(0, 11, 0)), Some(BlockId::TALL_GRASS));
        assert_eq!(world.get_block(IVec3::new(1, 11, 0)), Some(BlockId::AIR));
    }
}
