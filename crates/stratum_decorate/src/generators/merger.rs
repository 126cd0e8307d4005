use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_persist::archive::load_world;
use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};
use tracing::info;

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MergerOptions {
    world: Option<String>,
}

/// Blends columns of a previously exported world into the decorated area.
///
/// The mask value is the probability that a column is taken from the archive.
pub struct MergerGen {
    source: MemoryWorld,
}

impl MergerGen {
    pub fn new(source: MemoryWorld) -> Self {
        Self { source }
    }

    pub fn build(table: &toml::Table, ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: MergerOptions = parse_options("merger", table)?;
        let dir = options.world.ok_or_else(|| ConfigError::MissingField {
            kind: "merger".to_string(),
            field: "world",
        })?;
        let path = ctx.resolve(&dir);
        let (source, meta) = load_world(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Merging with world '{}' from {}", meta.name, path.display());
        Ok(GeneratorKind::Merger(Self::new(source)))
    }

    pub fn process_surface(
        &mut self,
        world: &mut dyn VoxelWorld,
        pos: IVec3,
        mask: f32,
        rng: &mut ChaCha8Rng,
    ) {
        let Some(column) = self.source.column(pos.x, pos.z) else {
            return;
        };
        if mask < 1.0 && rng.gen::<f32>() >= mask {
            return;
        }

        let bottom = world.min_y().max(self.source.min_y());
        let top = world.max_y().min(self.source.max_y());
        for y in bottom..=top {
            if let Some(block) = column.get((y - self.source.min_y()) as usize) {
                world.set_block(IVec3::new(pos.x, y, pos.z), block);
            }
        }
        world.set_biome(pos.x, pos.z, column.biome);
    }
}
