use glam::IVec3;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::config::{parse_options, resolve_block, BuildContext};
use crate::error::ConfigError;
use crate::generator::{GeneratorKind, Mask};
use crate::weightmap::{Channel, Weightmap};

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct WaterOptions {
    #[serde(alias = "waterlevel")]
    water_level: i32,
    #[serde(alias = "waterblock")]
    water_block: String,
    /// Grayscale raster whose values are per-column water levels.
    file: Option<String>,
}

impl Default for WaterOptions {
    fn default() -> Self {
        Self {
            water_level: 62,
            water_block: "water".to_string(),
            file: None,
        }
    }
}

/// Floods every column from its water level down to the terrain surface.
pub struct WaterGen {
    water_level: i32,
    block: BlockId,
    levels: Option<Mask>,
}

impl WaterGen {
    pub fn new(water_level: i32, block: BlockId) -> Self {
        Self {
            water_level,
            block,
            levels: None,
        }
    }

    pub fn with_levels(mut self, levels: Mask) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn build(table: &toml::Table, ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: WaterOptions = parse_options("water", table)?;
        let block = resolve_block(&options.water_block)?;
        let mut gen = Self::new(options.water_level, block);
        if let Some(file) = &options.file {
            let map = Weightmap::load(
                &ctx.resolve(file),
                Channel::Red,
                ctx.bounds.len_x(),
                ctx.bounds.len_z(),
            )?;
            gen = gen.with_levels(Mask::new(map, ctx.bounds));
        }
        Ok(GeneratorKind::Water(gen))
    }

    fn level_at(&self, x: i32, z: i32) -> i32 {
        let raster = self
            .levels
            .as_ref()
            .map_or(i32::MIN, |levels| (levels.sample(x, z) * 255.0).round() as i32);
        raster.max(self.water_level)
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3) {
        let start = self.level_at(pos.x, pos.z);
        for y in (pos.y + 1..=start).rev() {
            let at = IVec3::new(pos.x, y, pos.z);
            if world.is_air_or_null(at) {
                world.set_block(at, self.block);
            }
        }
    }
}
