use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::block::{registry, BlockId};
use stratum_shared::version::GameVersion;
use stratum_shared::world::{VoxelWorld, WorldView};
use tracing::info;

use crate::config::{parse_options, resolve_block, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;
use crate::layer::ChannelLayers;
use crate::weightmap::LayerChannel;

/// Columns whose surface lies below this height get no ores.
const MIN_SURFACE_Y: i32 = 4;

/// One vein rule: which ore, how big, how often and where.
#[derive(Clone, Debug, PartialEq)]
pub struct OreRule {
    block: BlockId,
    deep_block: Option<BlockId>,
    vein_size: u32,
    spawns_per_column: f32,
    y_min: i32,
    y_max: i32,
    falloff: f32,
    center: f32,
}

impl OreRule {
    /// `rarity` is the expected number of veins per 16x16 area.
    pub fn new(block: BlockId, vein_size: u32, rarity: f32, y_min: i32, y_max: i32) -> Self {
        Self {
            block,
            deep_block: registry().deep_variant(block),
            vein_size,
            spawns_per_column: rarity / 256.0,
            y_min,
            y_max,
            falloff: 0.0,
            center: (y_min + y_max) as f32 / 2.0,
        }
    }

    /// Biases spawns towards `center`; a falloff of 1 makes the chance drop to zero at the range ends.
    pub fn with_falloff(mut self, falloff: f32, center: f32) -> Self {
        self.falloff = falloff;
        self.center = center;
        self
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    fn chance_at(&self, y: i32) -> f32 {
        if self.falloff <= 0.0 {
            return 1.0;
        }
        let center = self
            .center
            .min(self.y_max as f32 - 0.01)
            .max(self.y_min as f32 + 0.01);
        let y = y as f32;
        let below = 1.0 - (y - center) / (self.y_min as f32 - center);
        let above = 1.0 - (y - center) / (self.y_max as f32 - center);
        let peak = below.min(above).max(0.0);
        1.0 + (peak - 1.0) * self.falloff
    }

    fn generate(&self, world: &mut dyn VoxelWorld, x: i32, z: i32, multiplier: f32, rng: &mut ChaCha8Rng) {
        if self.y_min > self.y_max {
            return;
        }
        if rng.gen::<f32>() > self.spawns_per_column * multiplier {
            return;
        }
        let y = rng.gen_range(self.y_min..=self.y_max);
        if rng.gen::<f32>() > self.chance_at(y) {
            return;
        }

        let span = (self.vein_size as i32 - 1).max(0) / 16 + 1;
        let origin = IVec3::new(x, y, z);
        for attempt in 0..self.vein_size {
            let pos = if attempt == 0 {
                origin
            } else {
                origin
                    + IVec3::new(
                        rng.gen_range(-span..=span),
                        rng.gen_range(-span..=span),
                        rng.gen_range(-span..=span),
                    )
            };
            if pos.y < self.y_min || pos.y > self.y_max {
                continue;
            }
            match world.get_block(pos) {
                Some(BlockId::STONE) => {
                    world.set_block(pos, self.block);
                }
                Some(BlockId::DEEPSLATE) => {
                    if let Some(deep) = self.deep_block {
                        world.set_block(pos, deep);
                    }
                }
                _ => {}
            }
        }
    }
}

/// The built-in ore set for a game version.
pub fn vanilla_ores(version: GameVersion) -> Vec<OreRule> {
    if version.is_deep_world() {
        return vec![
            OreRule::new(BlockId::IRON_ORE, 9, 7.5, -24, 64).with_falloff(0.5, 16.0),
            OreRule::new(BlockId::COAL_ORE, 24, 5.5, 0, 120),
            OreRule::new(BlockId::GOLD_ORE, 9, 1.0, -64, 30).with_falloff(0.5, -16.0),
            OreRule::new(BlockId::DIAMOND_ORE, 8, 0.35, -64, 16).with_falloff(1.0, -58.0),
            OreRule::new(BlockId::REDSTONE_ORE, 10, 1.2, -64, 16).with_falloff(1.0, -58.0),
            OreRule::new(BlockId::LAPIS_ORE, 9, 0.7, -64, 32).with_falloff(0.5, 0.0),
            OreRule::new(BlockId::COPPER_ORE, 10, 12.5, -16, 112).with_falloff(0.5, 48.0),
        ];
    }
    let mut ores = vec![
        OreRule::new(BlockId::IRON_ORE, 9, 7.5, 2, 64),
        OreRule::new(BlockId::COAL_ORE, 24, 5.5, 16, 120),
        OreRule::new(BlockId::GOLD_ORE, 9, 1.0, 2, 30),
        OreRule::new(BlockId::DIAMOND_ORE, 8, 0.35, 2, 16),
        OreRule::new(BlockId::REDSTONE_ORE, 10, 1.2, 4, 16),
        OreRule::new(BlockId::LAPIS_ORE, 9, 0.7, 4, 28),
    ];
    if version.has_copper() {
        ores.push(OreRule::new(BlockId::COPPER_ORE, 10, 12.5, 0, 72));
    }
    ores
}

pub struct OreLayer {
    ores: Vec<OreRule>,
    multiplier: f32,
}

impl OreLayer {
    pub fn new(ores: Vec<OreRule>) -> Self {
        Self {
            ores,
            multiplier: 1.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.multiplier = multiplier;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct OreRuleOptions {
    block: String,
    size: u32,
    rarity: f32,
    y_min: i32,
    y_max: i32,
    falloff: f32,
    center: Option<f32>,
}

impl Default for OreRuleOptions {
    fn default() -> Self {
        Self {
            block: String::new(),
            size: 10,
            rarity: 4.0,
            y_min: 1,
            y_max: 32,
            falloff: 0.0,
            center: None,
        }
    }
}

impl OreRuleOptions {
    fn into_rule(self) -> Result<OreRule, ConfigError> {
        if self.block.is_empty() {
            return Err(ConfigError::MissingField {
                kind: "ores".to_string(),
                field: "block",
            });
        }
        let block = resolve_block(&self.block)?;
        let rule = OreRule::new(block, self.size, self.rarity, self.y_min, self.y_max);
        let center = self.center.unwrap_or(rule.center);
        Ok(rule.with_falloff(self.falloff, center))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct OreLayerOptions {
    channel: LayerChannel,
    default: bool,
    multiplier: f32,
    ores: Vec<OreRuleOptions>,
}

impl Default for OreLayerOptions {
    fn default() -> Self {
        Self {
            channel: LayerChannel::None,
            default: false,
            multiplier: 1.0,
            ores: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct OresOptions {
    weightmap: Option<String>,
    multiplier: f32,
    layer: Vec<OreLayerOptions>,
}

impl Default for OresOptions {
    fn default() -> Self {
        Self {
            weightmap: None,
            multiplier: 1.0,
            layer: Vec::new(),
        }
    }
}

/// Scatters ore veins below each column, optionally split into weightmap-driven layers.
pub struct OresGen {
    layers: ChannelLayers<OreLayer>,
    multiplier: f32,
}

impl OresGen {
    pub fn new(layers: ChannelLayers<OreLayer>) -> Self {
        Self {
            layers,
            multiplier: 1.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn build(table: &toml::Table, ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: OresOptions = parse_options("ores", table)?;
        if options.weightmap.is_none() && options.layer.is_empty() {
            info!("Generating ores with default settings for version {}", ctx.version());
            let layers = ChannelLayers::always_on(OreLayer::new(vanilla_ores(ctx.version())));
            return Ok(GeneratorKind::Ores(
                Self::new(layers).with_multiplier(options.multiplier),
            ));
        }

        let mut layers = Vec::with_capacity(options.layer.len());
        for layer in options.layer {
            let mut ores = Vec::new();
            if layer.default {
                ores.extend(vanilla_ores(ctx.version()));
            }
            for rule in layer.ores {
                ores.push(rule.into_rule()?);
            }
            layers.push((
                layer.channel,
                OreLayer::new(ores).with_multiplier(layer.multiplier),
            ));
        }
        let layers = ChannelLayers::load("ores", options.weightmap.as_deref(), layers, ctx)?;
        Ok(GeneratorKind::Ores(
            Self::new(layers).with_multiplier(options.multiplier),
        ))
    }

    pub fn process_surface(
        &mut self,
        world: &mut dyn VoxelWorld,
        pos: IVec3,
        mask: f32,
        rng: &mut ChaCha8Rng,
    ) {
        if pos.y < MIN_SURFACE_Y {
            return;
        }
        let global = self.multiplier;
        self.layers.for_each_active(pos.x, pos.z, mask, |layer, strength| {
            let multiplier = layer.multiplier * strength * global;
            for ore in &layer.ores {
                ore.generate(world, pos.x, pos.z, multiplier, rng);
            }
        });
    }
}
