use glam::IVec3;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct NaturalOptions {
    waterlevel: i32,
}

impl Default for NaturalOptions {
    fn default() -> Self {
        Self { waterlevel: -1 }
    }
}

/// Floods low ground and gives the terrain a soil skin: grass over dirt above water, gravel below.
pub struct NaturalGen {
    water_level: i32,
}

impl NaturalGen {
    pub fn new(water_level: i32) -> Self {
        Self { water_level }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: NaturalOptions = parse_options("naturalize", table)?;
        Ok(GeneratorKind::Natural(Self::new(options.waterlevel)))
    }

    pub fn process_block(&mut self, world: &mut dyn VoxelWorld, pos: IVec3) {
        if pos.y <= self.water_level && world.is_air_or_null(pos) {
            world.set_block(pos, BlockId::WATER);
        }
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3) {
        if pos.y > self.water_level + 1 {
            world.set_block(pos, BlockId::GRASS_BLOCK);
            for i in 1..4 {
                world.set_block(pos - IVec3::Y * i, BlockId::DIRT);
            }
        } else {
            for i in 0..4 {
                world.set_block(pos - IVec3::Y * i, BlockId::GRAVEL);
            }
        }
    }
}
