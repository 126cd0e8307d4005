use glam::IVec3;
use stratum_shared::biome::BiomeId;
use stratum_shared::block::{registry, BlockFlags, BlockId};
use stratum_shared::world::{VoxelWorld, WorldView};
use tracing::error;

use crate::config::BuildContext;
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

/// Thawed counterpart of a frozen biome.
pub fn thawed_biome(biome: BiomeId) -> Option<BiomeId> {
    let thawed = match biome {
        BiomeId::SnowyTundra | BiomeId::IceSpikes => BiomeId::Plains,
        BiomeId::SnowyTaiga => BiomeId::Taiga,
        BiomeId::SnowyTaigaHills => BiomeId::TaigaHills,
        BiomeId::SnowyTaigaMountains => BiomeId::TaigaMountains,
        BiomeId::SnowyMountains => BiomeId::Mountains,
        BiomeId::FrozenRiver => BiomeId::River,
        BiomeId::FrozenOcean => BiomeId::Ocean,
        BiomeId::SnowyBeach => BiomeId::Beach,
        BiomeId::DeepFrozenOcean => BiomeId::DeepOcean,
        _ => return None,
    };
    Some(thawed)
}

/// Replacement for a frozen block: snow melts away, ice turns back into water.
pub fn thawed_block(block: BlockId) -> Option<BlockId> {
    match block {
        BlockId::SNOW | BlockId::SNOW_BLOCK | BlockId::POWDER_SNOW => Some(BlockId::AIR),
        BlockId::ICE | BlockId::PACKED_ICE | BlockId::BLUE_ICE => Some(BlockId::WATER),
        _ => None,
    }
}

/// Undoes winter: remaps frozen biomes and strips snow and ice. Ignores the mask strength.
#[derive(Default)]
pub struct ThawGen;

impl ThawGen {
    pub fn build(_table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        Ok(GeneratorKind::Thaw(Self))
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3) {
        match world.get_biome(pos.x, pos.z) {
            Some(biome) => {
                if let Some(thawed) = thawed_biome(biome) {
                    world.set_biome(pos.x, pos.z, thawed);
                }
            }
            None => error!("Biome at [{},{}] was null", pos.x, pos.z),
        }
    }

    pub fn process_block(&mut self, world: &mut dyn VoxelWorld, pos: IVec3) {
        let Some(block) = world.get_block(pos) else {
            return;
        };
        if block.is_air() {
            return;
        }
        if block.has_flags(BlockFlags::SNOWY) {
            world.set_block(pos, registry().without_snowy(block));
        } else if let Some(thawed) = thawed_block(block) {
            world.set_block(pos, thawed);
        }
    }
}
