use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::biome::BiomeId;
use stratum_shared::block::{registry, BlockId};
use stratum_shared::world::{HeightmapKind, VoxelWorld, WorldView};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

/// Lowest Y at which a biome is cold enough for snow. Biomes without an entry never freeze.
pub fn snow_threshold(biome: BiomeId) -> Option<i32> {
    use BiomeId::*;
    match biome {
        SnowyTundra | IceSpikes | SnowyTaiga | SnowyTaigaHills | SnowyTaigaMountains
        | SnowyMountains | SnowyBeach => Some(-999),
        GravellyMountains | ModifiedGravellyMountains | Mountains | MountainEdge
        | TaigaMountains | WoodedMountains | StoneShore => Some(128),
        Taiga | TaigaHills | GiantSpruceTaiga | GiantSpruceTaigaHills | GiantTreeTaiga
        | GiantTreeTaigaHills => Some(168),
        FrozenOcean | DeepFrozenOcean => Some(72),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SnowOptions {
    top_only: bool,
    check_biomes: bool,
}

impl Default for SnowOptions {
    fn default() -> Self {
        Self {
            top_only: true,
            check_biomes: true,
        }
    }
}

/// Covers cold columns with snow layers and freezes exposed water.
///
/// The mask strength drives ice coverage: anything at or above 0.25 freezes completely.
pub struct SnowGen {
    top_only: bool,
    check_biomes: bool,
}

impl SnowGen {
    pub fn new(top_only: bool, check_biomes: bool) -> Self {
        Self {
            top_only,
            check_biomes,
        }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: SnowOptions = parse_options("snow", table)?;
        Ok(GeneratorKind::Snow(Self::new(
            options.top_only,
            options.check_biomes,
        )))
    }

    pub fn process_surface(
        &mut self,
        world: &mut dyn VoxelWorld,
        pos: IVec3,
        mask: f32,
        rng: &mut ChaCha8Rng,
    ) {
        let Some(biome) = world.get_biome(pos.x, pos.z) else {
            return;
        };
        if !self.top_only {
            self.freeze(world, pos, mask, biome, rng);
        }
        let top = world.highest_block(pos.x, pos.z, HeightmapKind::SolidBlocks);
        if self.top_only || top > pos.y {
            self.freeze(world, IVec3::new(pos.x, top, pos.z), mask, biome, rng);
        }
    }

    fn cold_enough(&self, biome: BiomeId, y: i32) -> bool {
        if !self.check_biomes {
            return true;
        }
        snow_threshold(biome).is_some_and(|threshold| y >= threshold)
    }

    fn freeze(
        &self,
        world: &mut dyn VoxelWorld,
        pos: IVec3,
        mask: f32,
        biome: BiomeId,
        rng: &mut ChaCha8Rng,
    ) {
        if !self.cold_enough(biome, pos.y) || !world.is_air_or_null(pos + IVec3::Y) {
            return;
        }
        let Some(block) = world.get_block(pos) else {
            return;
        };

        if block.is_water() {
            if mask >= 1.0 || rng.gen::<f32>() <= mask * 4.0 {
                world.set_block(pos, BlockId::ICE);
            }
            return;
        }
        if block.is_liquid() || block == BlockId::SNOW || block == BlockId::ICE {
            return;
        }
        world.set_block(pos + IVec3::Y, BlockId::SNOW);
        if let Some(snowy) = registry().snowy_variant(block) {
            world.set_block(pos, snowy);
        }
    }
}
