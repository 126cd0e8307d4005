use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use stratum_shared::block::BlockId;
use stratum_shared::heightmap::Heightmap;
use stratum_shared::world::{ColumnBand, VoxelWorld, WorldView};
use tracing::info;

use crate::config::ExportSettings;

/// Width in columns of the X-bands filled in parallel.
const BAND_WIDTH: usize = 16;

/// Height above the floor of the single bedrock cell in noisy mode.
fn bedrock_offset(rng: &mut ChaCha8Rng) -> i32 {
    // weights 4:3:2:1 for offsets 0..=3
    match rng.gen_range(0..10) {
        0..=3 => 0,
        4..=6 => 1,
        7..=8 => 2,
        _ => 3,
    }
}

struct Fill {
    floor: i32,
    deep_below: Option<i32>,
    default_block: BlockId,
    flat_bedrock: bool,
}

impl Fill {
    fn band(&self, band: &mut ColumnBand<'_>, heightmap: &Heightmap, rng: &mut ChaCha8Rng, ceiling: i32) {
        for lx in 0..band.len_x() {
            for lz in 0..band.len_z() {
                let x = band.x_min + lx as i32;
                let z = band.z_min + lz as i32;
                let top = heightmap.get(x, z).min(ceiling);
                if top < self.floor {
                    continue;
                }
                for y in self.floor..=top {
                    let block = match self.deep_below {
                        Some(transition) if y < transition => BlockId::DEEPSLATE,
                        _ => self.default_block,
                    };
                    band.set(x, y, z, block);
                }
                let offset = if self.flat_bedrock {
                    0
                } else {
                    bedrock_offset(rng)
                };
                band.set(x, (self.floor + offset).min(top), z, BlockId::BEDROCK);
            }
        }
    }
}

/// Fills every column from the world floor up to its heightmap value.
///
/// Deep worlds get deepslate below the transition height. Each column holds exactly one bedrock
/// cell: on the floor when `flat_bedrock` is set, otherwise up to three cells above it.
pub fn build_base_terrain<W: VoxelWorld>(world: &mut W, heightmap: &Heightmap, settings: &ExportSettings) {
    let version = settings.version;
    let fill = Fill {
        floor: world.min_y(),
        deep_below: version.deep_transition(),
        default_block: world.default_block(),
        flat_bedrock: settings.flat_bedrock,
    };
    let ceiling = world.max_y();
    let seed = settings.seed;
    let bounds = world.bounds();

    world
        .x_bands_mut(BAND_WIDTH)
        .into_par_iter()
        .enumerate()
        .for_each(|(index, mut band)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64));
            fill.band(&mut band, heightmap, &mut rng, ceiling);
        });

    info!(
        "Filled base terrain for {}x{} columns",
        bounds.len_x(),
        bounds.len_z()
    );
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::Boundary;
    use stratum_shared::heightmap::Heightmap;
    use stratum_shared::version::GameVersion;
    use stratum_shared::world::{MemoryWorld, WorldView};

    use super::build_base_terrain;
    use crate::config::ExportSettings;

    fn bedrock_cells(world: &MemoryWorld, x: i32, z: i32) -> Vec<i32> {
        (world.min_y()..=world.max_y())
            .filter(|&y| world.get_block(IVec3::new(x, y, z)) == Some(BlockId::BEDROCK))
            .collect()
    }

    #[test]
    fn deep_worlds_layer_deepslate_under_stone() {
        let bounds = Boundary::from_size(0, 0, 20, 3);
        let version = GameVersion::release(18);
        let mut world = MemoryWorld::new(bounds, version, BiomeId::Plains);
        let heightmap = Heightmap::new_filled(bounds, 64);
        let settings = ExportSettings {
            version,
            flat_bedrock: true,
            ..ExportSettings::default()
        };
        build_base_terrain(&mut world, &heightmap, &settings);

        for x in 0..20 {
            assert_eq!(bedrock_cells(&world, x, 1), vec![-64]);
            assert_eq!(world.get_block(IVec3::new(x, -63, 1)), Some(BlockId::DEEPSLATE));
            assert_eq!(world.get_block(IVec3::new(x, -1, 1)), Some(BlockId::DEEPSLATE));
            assert_eq!(world.get_block(IVec3::new(x, 0, 1)), Some(BlockId::STONE));
            assert_eq!(world.get_block(IVec3::new(x, 64, 1)), Some(BlockId::STONE));
            assert_eq!(world.get_block(IVec3::new(x, 65, 1)), Some(BlockId::AIR));
        }
    }

    #[test]
    fn noisy_bedrock_stays_in_the_band_and_is_reproducible() {
        let bounds = Boundary::from_size(-8, -8, 40, 8);
        let version = GameVersion::release(16);
        let heightmap = Heightmap::from_fn(bounds, |x, _| if x == -8 { 1 } else { 30 });
        let settings = ExportSettings {
            version,
            seed: 99,
            ..ExportSettings::default()
        };

        let mut first = MemoryWorld::new(bounds, version, BiomeId::Plains);
        build_base_terrain(&mut first, &heightmap, &settings);
        let mut second = MemoryWorld::new(bounds, version, BiomeId::Plains);
        build_base_terrain(&mut second, &heightmap, &settings);
        assert_eq!(first.columns(), second.columns());

        for x in bounds.x_min..=bounds.x_max {
            for z in bounds.z_min..=bounds.z_max {
                let cells = bedrock_cells(&first, x, z);
                assert_eq!(cells.len(), 1);
                assert!((0..=3).contains(&cells[0]));
                if x == -8 {
                    assert!(cells[0] <= 1);
                }
            }
        }
    }
}
