use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct BedrockOptions {
    flat: bool,
}

/// Thickens the floor into a ragged bedrock band that thins out with height.
pub struct BedrockGen {
    flat: bool,
}

impl BedrockGen {
    pub fn new(flat: bool) -> Self {
        Self { flat }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: BedrockOptions = parse_options("bedrock", table)?;
        Ok(GeneratorKind::Bedrock(Self::new(options.flat)))
    }

    pub fn band(&self, floor: i32) -> (i32, i32) {
        if self.flat {
            (floor, floor)
        } else {
            (floor, floor + 3)
        }
    }

    pub fn process_block(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, rng: &mut ChaCha8Rng) {
        let height = (pos.y - world.min_y()) as f32;
        if rng.gen::<f32>() < 1.0 - height / 4.0 && !world.is_air_or_null(pos) {
            world.set_block(pos, BlockId::BEDROCK);
        }
    }
}
