use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct TorchOptions {
    amount: f32,
}

impl Default for TorchOptions {
    fn default() -> Self {
        Self { amount: 0.02 }
    }
}

/// Drops torches on random surface columns.
pub struct TorchGen {
    chance: f32,
}

impl TorchGen {
    pub fn new(chance: f32) -> Self {
        Self { chance }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: TorchOptions = parse_options("torches", table)?;
        Ok(GeneratorKind::Torches(Self::new(options.amount)))
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, rng: &mut ChaCha8Rng) {
        let above = pos + IVec3::Y;
        if rng.gen::<f32>() <= self.chance && world.is_air_or_null(above) {
            world.set_block(above, BlockId::TORCH);
        }
    }
}
