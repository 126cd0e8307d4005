use std::sync::Arc;

use glam::IVec3;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::biome::BiomeId;
use stratum_shared::block::{BlockFlags, BlockId};
use stratum_shared::coords::Boundary;
use stratum_shared::world::{VoxelWorld, WorldView};
use tracing::warn;

use crate::config::{parse_options, resolve_biome, resolve_block, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;
use crate::structure::Structure;
use crate::weightmap::{SplatMap, NO_LAYER};

/// Colors a splatmap layer may be named by instead of spelling out `r,g,b`.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("orange", [255, 128, 0]),
    ("lime", [128, 255, 0]),
    ("purple", [128, 0, 255]),
    ("brown", [128, 64, 0]),
    ("darkgreen", [0, 128, 0]),
    ("darkblue", [0, 0, 128]),
];

pub fn parse_color(input: &str) -> Option<[u8; 3]> {
    let input = input.trim();
    if input.contains(',') {
        let mut channels = input.split(',').map(|c| c.trim().parse::<u8>());
        let color = [
            channels.next()?.ok()?,
            channels.next()?.ok()?,
            channels.next()?.ok()?,
        ];
        return channels.next().is_none().then_some(color);
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(input))
        .map(|&(_, color)| color)
}

/// Inclusive height window a surface generator is limited to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct YRange {
    pub min: i32,
    pub max: i32,
}

impl YRange {
    pub const ANY: Self = Self {
        min: i32::MIN,
        max: i32::MAX,
    };

    fn contains(self, y: i32) -> bool {
        (self.min..=self.max).contains(&y)
    }
}

/// 2D noise that lets a block sequence through only where it stays under the threshold.
pub struct NoiseGate {
    perlin: Perlin,
    frequency: f64,
    threshold: f32,
}

impl NoiseGate {
    pub fn new(seed: u32, scale: f32, threshold: f32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            frequency: 1.0 / (scale as f64 * 2.6),
            threshold,
        }
    }

    fn passes(&self, x: i32, z: i32) -> bool {
        let value = self
            .perlin
            .get([x as f64 * self.frequency, z as f64 * self.frequency]);
        ((value * 0.5 + 0.5) as f32) < self.threshold
    }
}

pub enum Placement {
    Structure(Arc<Structure>),
    Block(BlockId),
}

pub enum SurfaceGen {
    /// Overwrites the top blocks of the column, one entry per layer going down. `None` keeps a layer.
    Blocks {
        blocks: Vec<Option<BlockId>>,
        noise: Option<NoiseGate>,
        range: YRange,
    },
    /// Places a block or a structure on top of the surface with `chance`.
    Scatter {
        placement: Placement,
        chance: f32,
        plant_check: bool,
        range: YRange,
    },
    Biome {
        biome: BiomeId,
        range: YRange,
    },
}

impl SurfaceGen {
    fn generate(&self, world: &mut dyn VoxelWorld, pos: IVec3, rng: &mut ChaCha8Rng) -> bool {
        match self {
            SurfaceGen::Blocks {
                blocks,
                noise,
                range,
            } => {
                if noise.as_ref().is_some_and(|gate| !gate.passes(pos.x, pos.z)) {
                    return false;
                }
                if !range.contains(pos.y) {
                    return false;
                }
                let mut placed = false;
                for (i, block) in blocks.iter().enumerate() {
                    let at = pos - IVec3::Y * i as i32;
                    if let Some(block) = *block {
                        if !world.is_air_or_null(at) {
                            placed |= world.set_block(at, block);
                        }
                    }
                }
                placed
            }
            SurfaceGen::Scatter {
                placement,
                chance,
                plant_check,
                range,
            } => {
                if *plant_check {
                    let sustains = world
                        .get_block(pos)
                        .is_some_and(|b| b.has_flags(BlockFlags::PLANT_SUSTAINING));
                    if !sustains || !world.is_air_or_null(pos + IVec3::Y) {
                        return false;
                    }
                }
                if !range.contains(pos.y) {
                    return false;
                }
                if rng.gen::<f32>() >= chance / 128.0 {
                    return false;
                }
                match placement {
                    Placement::Structure(structure) => structure.build(world, pos + IVec3::Y),
                    Placement::Block(block) => world.set_block(pos + IVec3::Y, *block),
                }
            }
            SurfaceGen::Biome { biome, range } => {
                if !range.contains(pos.y) {
                    return false;
                }
                world.set_biome(pos.x, pos.z, *biome)
            }
        }
    }
}

/// A named bundle of surface generators that runs on columns classified to its color.
pub struct SurfaceLayer {
    pub name: Option<String>,
    pub color: [u8; 3],
    pub generators: Vec<SurfaceGen>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RangeOptions {
    y_min: Option<i32>,
    y_max: Option<i32>,
}

impl RangeOptions {
    fn range(&self) -> YRange {
        YRange {
            min: self.y_min.unwrap_or(i32::MIN),
            max: self.y_max.unwrap_or(i32::MAX),
        }
    }
}

fn default_scale() -> f32 {
    1.0
}

fn default_threshold() -> f32 {
    0.5
}

fn default_amount() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BlocksOptions {
    blocks: Vec<String>,
    #[serde(default = "default_scale")]
    scale: f32,
    #[serde(default = "default_threshold")]
    threshold: f32,
    #[serde(flatten)]
    range: RangeOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ScatterOptions {
    schem: Option<String>,
    block: Option<String>,
    #[serde(default = "default_amount")]
    amount: f32,
    #[serde(default = "default_true")]
    plant_check: bool,
    #[serde(flatten)]
    range: RangeOptions,
}

#[derive(Debug, Deserialize)]
struct BiomeOptions {
    id: String,
    #[serde(flatten)]
    range: RangeOptions,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SurfaceGenOptions {
    Standard(BlocksOptions),
    Perlin(BlocksOptions),
    Structure(ScatterOptions),
    Biome(BiomeOptions),
}

#[derive(Debug, Deserialize)]
struct LayerOptions {
    color: Option<String>,
    name: Option<String>,
    #[serde(default)]
    generators: Vec<SurfaceGenOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SplatOptions {
    file: Option<String>,
    layer: Vec<LayerOptions>,
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        kind: "splat".to_string(),
        field,
        reason,
    }
}

fn resolve_sequence(blocks: &[String]) -> Result<Vec<Option<BlockId>>, ConfigError> {
    blocks
        .iter()
        .map(|name| {
            if name.trim().is_empty() {
                Ok(None)
            } else {
                resolve_block(name).map(Some)
            }
        })
        .collect()
}

fn build_surface_gen(
    options: SurfaceGenOptions,
    ctx: &BuildContext,
    noise_seed: u32,
) -> Result<Option<SurfaceGen>, ConfigError> {
    let gen = match options {
        SurfaceGenOptions::Standard(o) => SurfaceGen::Blocks {
            blocks: resolve_sequence(&o.blocks)?,
            noise: None,
            range: o.range.range(),
        },
        SurfaceGenOptions::Perlin(o) => SurfaceGen::Blocks {
            blocks: resolve_sequence(&o.blocks)?,
            noise: Some(NoiseGate::new(noise_seed, o.scale, o.threshold)),
            range: o.range.range(),
        },
        SurfaceGenOptions::Structure(o) => {
            let placement = match (&o.schem, &o.block) {
                (Some(key), _) => {
                    let structure = ctx
                        .schematics
                        .get(key)
                        .ok_or_else(|| invalid("schem", format!("no structure registered as '{key}'")))?;
                    Placement::Structure(Arc::clone(structure))
                }
                (None, Some(block)) => Placement::Block(resolve_block(block)?),
                (None, None) => {
                    warn!("Structure generator needs either 'schem' or 'block'; skipping it");
                    return Ok(None);
                }
            };
            SurfaceGen::Scatter {
                placement,
                chance: o.amount,
                plant_check: o.plant_check,
                range: o.range.range(),
            }
        }
        SurfaceGenOptions::Biome(o) => SurfaceGen::Biome {
            biome: resolve_biome(&o.id)?,
            range: o.range.range(),
        },
    };
    Ok(Some(gen))
}

/// Decorates each column with the layer its splatmap color is closest to.
pub struct SplatGen {
    map: SplatMap,
    origin_x: i32,
    origin_z: i32,
    layers: Vec<SurfaceLayer>,
}

impl SplatGen {
    pub fn new(map: SplatMap, bounds: Boundary, layers: Vec<SurfaceLayer>) -> Self {
        Self {
            map,
            origin_x: bounds.x_min,
            origin_z: bounds.z_min,
            layers,
        }
    }

    pub fn build(table: &toml::Table, ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: SplatOptions = parse_options("splat", table)?;
        let file = options.file.ok_or_else(|| ConfigError::MissingField {
            kind: "splat".to_string(),
            field: "file",
        })?;

        let mut layers = Vec::new();
        let mut noise_seed = ctx.seed as u32;
        for layer in options.layer {
            let Some(color) = layer.color else {
                warn!("Splat layer {:?} is missing required field 'color'", layer.name);
                continue;
            };
            let color =
                parse_color(&color).ok_or_else(|| invalid("color", format!("'{color}' is not a color")))?;
            let mut generators = Vec::new();
            for gen in layer.generators {
                noise_seed = noise_seed.wrapping_add(1);
                if let Some(gen) = build_surface_gen(gen, ctx, noise_seed)? {
                    generators.push(gen);
                }
            }
            layers.push(SurfaceLayer {
                name: layer.name,
                color,
                generators,
            });
        }

        let palette: Vec<[u8; 3]> = layers.iter().map(|l| l.color).collect();
        let map = SplatMap::load(
            &ctx.resolve(&file),
            &palette,
            ctx.settings.dither_limit,
            ctx.bounds.len_x(),
            ctx.bounds.len_z(),
        )?;
        Ok(GeneratorKind::Splat(Self::new(map, ctx.bounds, layers)))
    }

    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, rng: &mut ChaCha8Rng) {
        let index = self.map.get(pos.x - self.origin_x, pos.z - self.origin_z);
        if index == NO_LAYER {
            return;
        }
        if let Some(layer) = self.layers.get(index as usize) {
            for gen in &layer.generators {
                gen.generate(world, pos, rng);
            }
        }
    }
}
