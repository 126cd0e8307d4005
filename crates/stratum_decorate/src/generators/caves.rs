use glam::{IVec3, Vec3};
use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::block::{BlockFlags, BlockId};
use stratum_shared::coords::HORIZONTAL_NEIGHBORS;
use stratum_shared::world::{VoxelWorld, WorldView};
use tracing::{info, warn};

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;
use crate::layer::ChannelLayers;
use crate::weightmap::LayerChannel;

const INV_CHUNK_AREA: f64 = 1.0 / 256.0;
const MAX_BRANCH_DEPTH: u32 = 3;
const MAX_CAVE_LIFE: i32 = 400;

fn default_lava_height() -> i32 {
    8
}

fn no_channel() -> LayerChannel {
    LayerChannel::None
}

fn chance(rng: &mut ChaCha8Rng, p: f64) -> bool {
    rng.gen::<f64>() <= p
}

fn range(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Removes one cell. Air, bedrock and liquids are left alone; soil only goes when `break_surface`.
fn carve_block(world: &mut dyn VoxelWorld, pos: IVec3, break_surface: bool, lava_height: i32) -> bool {
    let Some(block) = world.get_block(pos) else {
        return false;
    };
    if block.is_air() {
        return false;
    }
    if block.has_flags(BlockFlags::TERRAIN_SURFACE) && !break_surface {
        return false;
    }
    if block == BlockId::BEDROCK || block.is_liquid() {
        return false;
    }
    let fill = if pos.y <= lava_height {
        BlockId::LAVA
    } else {
        BlockId::AIR
    };
    world.set_block(pos, fill);
    true
}

fn carve_sphere(
    world: &mut dyn VoxelWorld,
    center: Vec3,
    radius: f32,
    break_surface: bool,
    lava_height: i32,
) -> bool {
    let min = (center - Vec3::splat(radius)).floor().as_ivec3();
    let max = (center + Vec3::splat(radius)).ceil().as_ivec3();
    let mut carved = false;
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let cell = IVec3::new(x, y, z);
                if cell.as_vec3().distance(center) < radius {
                    carved |= carve_block(world, cell, break_surface, lava_height);
                }
            }
        }
    }
    carved
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Equal,
    #[default]
    Bottom,
    Top,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct CaveOptions {
    amount: f32,
    distribution: Distribution,
    y_min: i32,
    y_max: i32,
    scale: f32,
    variation: f32,
    lava_height: i32,
}

impl Default for CaveOptions {
    fn default() -> Self {
        Self {
            amount: 1.0,
            distribution: Distribution::Bottom,
            y_min: 8,
            y_max: 92,
            scale: 1.0,
            variation: 1.0,
            lava_height: default_lava_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct CavernOptions {
    y_min: i32,
    y_max: i32,
    center: Option<i32>,
    threshold: f32,
    scale_xz: f32,
    scale_y: f32,
    noise: f32,
    lava_height: i32,
}

impl Default for CavernOptions {
    fn default() -> Self {
        Self {
            y_min: 4,
            y_max: 32,
            center: None,
            threshold: 0.68,
            scale_xz: 1.0,
            scale_y: 1.0,
            noise: 1.0,
            lava_height: default_lava_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SpringOptions {
    y_min: i32,
    y_max: i32,
    amount: f32,
    lava: bool,
    lava_height: i32,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            y_min: 10,
            y_max: 80,
            amount: 1.0,
            lava: false,
            lava_height: default_lava_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum CarverOptions {
    Caves(CaveOptions),
    Caverns(CavernOptions),
    Springs(SpringOptions),
}

#[derive(Debug, Deserialize)]
struct CaveLayerOptions {
    #[serde(default = "no_channel")]
    channel: LayerChannel,
    #[serde(default)]
    carvers: Vec<CarverOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CavesOptions {
    weightmap: Option<String>,
    layer: Vec<CaveLayerOptions>,
}

/// Random-walk tunnels that start at a height picked by the distribution.
pub struct CaveCarver {
    amount: f32,
    distribution: Distribution,
    y_min: i32,
    y_max: i32,
    scale: f32,
    variation: f32,
    lava_height: i32,
}

impl CaveCarver {
    fn new(options: &CaveOptions) -> Self {
        Self {
            amount: options.amount,
            distribution: options.distribution,
            y_min: options.y_min,
            y_max: options.y_max,
            scale: options.scale,
            variation: options.variation,
            lava_height: options.lava_height,
        }
    }

    fn process_column(&self, world: &mut dyn VoxelWorld, top: IVec3, mask: f32, rng: &mut ChaCha8Rng) {
        let p = self.amount as f64 * 0.15 * INV_CHUNK_AREA * (top.y as f64 * 0.016) * mask as f64;
        if !chance(rng, p) {
            return;
        }
        let mut r = rng.gen::<f32>();
        match self.distribution {
            Distribution::Equal => {}
            Distribution::Bottom => r *= r,
            Distribution::Top => r = r.sqrt(),
        }
        let y = lerp(self.y_min as f32, self.y_max as f32, r) as i32;
        if y > top.y {
            return;
        }
        self.walk(world, Vec3::new(top.x as f32, y as f32, top.z as f32), rng);
    }

    /// Starts a cave and rolls once whether it, and every branch it spawns, may break the surface.
    fn walk(&self, world: &mut dyn VoxelWorld, start: Vec3, rng: &mut ChaCha8Rng) -> u32 {
        let break_surface = chance(rng, 0.4);
        self.tunnel(world, start, 0, 1.0, break_surface, rng)
    }

    /// Digs one branch. Returns the number of steps the branch took, its sub-branches excluded.
    fn tunnel(
        &self,
        world: &mut dyn VoxelWorld,
        mut pos: Vec3,
        depth: u32,
        max_delta: f32,
        break_surface: bool,
        rng: &mut ChaCha8Rng,
    ) -> u32 {
        let delta = range(rng, max_delta * 0.25, max_delta);
        let mut life = ((range(rng, 50.0, 300.0) * delta) as i32).min(MAX_CAVE_LIFE);
        let mut size = range(rng, 2.0, 7.5 * delta) * self.scale;
        let mut variation = range(rng, 0.2, 1.0) * self.variation;
        let mut direction = random_direction(rng, depth == 0);
        let branching = if delta > 0.25 && depth < MAX_BRANCH_DEPTH {
            size as f64 * 0.01
        } else {
            0.0
        };

        let mut steps = 0;
        while life > 0 {
            life -= 1;
            steps += 1;
            if !carve_sphere(world, pos, size, break_surface, self.lava_height) {
                // nothing left to carve
                break;
            }
            let turn = apply_y_weights(pos.y, random_direction(rng, true));
            direction = (direction + turn * variation * 0.5).normalize_or_zero();
            size = lerp(size, range(rng, 2.0, 6.0) * delta * self.scale, 0.15);
            variation = lerp(variation, range(rng, 0.2, 1.0) * self.variation, 0.1);
            if chance(rng, branching) {
                self.tunnel(world, pos, depth + 1, max_delta * 0.8, break_surface, rng);
            }
            pos += direction;
        }
        steps
    }
}

fn random_direction(rng: &mut ChaCha8Rng, allow_upwards: bool) -> Vec3 {
    Vec3::new(
        range(rng, -1.0, 1.0),
        range(rng, -1.0, if allow_upwards { 1.0 } else { 0.0 }),
        range(rng, -1.0, 1.0),
    )
    .normalize_or_zero()
}

fn smoothstep(v: f32, a: f32, b: f32) -> f32 {
    if v <= a {
        return a;
    }
    if v >= b {
        return b;
    }
    let t = ((v - a) / (b - a)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Bends tunnels upward near the floor so they do not dig into bedrock.
fn apply_y_weights(y: f32, dir: Vec3) -> Vec3 {
    let weight = if y < 16.0 {
        smoothstep(1.0 - y / 16.0, 0.0, 1.0)
    } else {
        0.0
    };
    dir.lerp(Vec3::Y, weight)
}

/// Large open chambers where 3D noise exceeds a threshold, fading out towards the band edges.
pub struct CavernCarver {
    y_min: i32,
    y_max: i32,
    center: i32,
    threshold: f32,
    frequency: [f64; 3],
    persistence: f64,
    lava_height: i32,
    perlin: Perlin,
}

impl CavernCarver {
    const OCTAVES: usize = 3;

    fn new(options: &CavernOptions, seed: u64) -> Self {
        let center = options
            .center
            .unwrap_or_else(|| lerp(options.y_min as f32, options.y_max as f32, 0.3) as i32);
        Self {
            y_min: options.y_min,
            y_max: options.y_max,
            center,
            threshold: options.threshold,
            frequency: [
                0.06 / options.scale_xz as f64,
                0.10 / options.scale_y as f64,
                0.06 / options.scale_xz as f64,
            ],
            persistence: 0.15 * options.noise as f64,
            lava_height: options.lava_height,
            perlin: Perlin::new(seed as u32),
        }
    }

    /// Fractal noise in `0..=1`.
    fn sample(&self, x: i32, y: i32, z: i32) -> f32 {
        let mut total = 0.0;
        let mut norm = 0.0;
        let mut amplitude = 1.0;
        let mut scale = 1.0;
        for _ in 0..Self::OCTAVES {
            let point = [
                x as f64 * self.frequency[0] * scale,
                y as f64 * self.frequency[1] * scale,
                z as f64 * self.frequency[2] * scale,
            ];
            total += self.perlin.get(point) * amplitude;
            norm += amplitude;
            amplitude *= self.persistence;
            scale *= 2.0;
        }
        ((total / norm) * 0.5 + 0.5) as f32
    }

    fn height_weight(&self, y: i32) -> f32 {
        let bound = if y < self.center { self.y_min } else { self.y_max };
        if y == self.center || bound == self.center {
            return 1.0;
        }
        let angle = (y - self.center) as f32 * std::f32::consts::PI / (self.center - bound) as f32 * 0.5;
        angle.cos().max(0.0).sqrt()
    }

    fn process_column(&self, world: &mut dyn VoxelWorld, top: IVec3, mask: f32) {
        for y in self.y_min..=self.y_max.min(top.y) {
            let noise = 2.0 * (self.sample(top.x, y, top.z) - 0.5) + 0.5;
            if noise * self.height_weight(y) * mask > self.threshold {
                carve_block(world, IVec3::new(top.x, y, top.z), true, self.lava_height);
            }
        }
    }
}

/// Single water or lava sources set into cave walls.
pub struct SpringCarver {
    y_min: i32,
    y_max: i32,
    amount: f32,
    block: BlockId,
}

impl SpringCarver {
    fn new(options: &SpringOptions) -> Self {
        Self {
            y_min: options.y_min,
            y_max: options.y_max,
            amount: options.amount,
            block: if options.lava {
                BlockId::LAVA
            } else {
                BlockId::WATER
            },
        }
    }

    fn pick_height(&self, rng: &mut ChaCha8Rng) -> i32 {
        if self.y_min < self.y_max {
            rng.gen_range(self.y_min..=self.y_max)
        } else {
            self.y_min
        }
    }

    fn process_column(&self, world: &mut dyn VoxelWorld, top: IVec3, mask: f32, rng: &mut ChaCha8Rng) {
        if !chance(rng, self.amount as f64 * 0.08 * mask as f64) {
            return;
        }
        let y = self.pick_height(rng);
        if y > top.y {
            return;
        }
        let pos = IVec3::new(top.x, y, top.z);
        if can_hold_spring(world, pos) {
            world.set_block(pos, self.block);
            world.mark_for_tick_update(pos);
        }
    }
}

/// Default rock with one or two open sides and closed above and below.
fn can_hold_spring(world: &dyn VoxelWorld, pos: IVec3) -> bool {
    if !world.is_default_block(pos) {
        return false;
    }
    let open = HORIZONTAL_NEIGHBORS
        .iter()
        .filter(|&&offset| world.is_air_not_null(pos + offset))
        .count();
    (1..=2).contains(&open)
        && !world.is_air_or_null(pos + IVec3::Y)
        && !world.is_air_or_null(pos - IVec3::Y)
}

pub enum Carver {
    Caves(CaveCarver),
    Caverns(CavernCarver),
    Springs(SpringCarver),
}

impl Carver {
    fn from_options(options: &CarverOptions, seed: u64) -> Self {
        match options {
            CarverOptions::Caves(o) => Carver::Caves(CaveCarver::new(o)),
            CarverOptions::Caverns(o) => Carver::Caverns(CavernCarver::new(o, seed)),
            CarverOptions::Springs(o) => Carver::Springs(SpringCarver::new(o)),
        }
    }

    fn process_column(&self, world: &mut dyn VoxelWorld, top: IVec3, mask: f32, rng: &mut ChaCha8Rng) {
        match self {
            Carver::Caves(c) => c.process_column(world, top, mask, rng),
            Carver::Caverns(c) => c.process_column(world, top, mask),
            Carver::Springs(c) => c.process_column(world, top, mask, rng),
        }
    }
}

/// Carvers that run together wherever their layer is active.
pub struct CaveLayer {
    carvers: Vec<Carver>,
}

impl CaveLayer {
    pub fn new(carvers: Vec<Carver>) -> Self {
        Self { carvers }
    }

    /// Tunnels, caverns, water springs and half-rate lava springs.
    pub fn standard(seed: u64) -> Self {
        Self::new(vec![
            Carver::Caves(CaveCarver::new(&CaveOptions::default())),
            Carver::Caverns(CavernCarver::new(&CavernOptions::default(), seed)),
            Carver::Springs(SpringCarver::new(&SpringOptions::default())),
            Carver::Springs(SpringCarver::new(&SpringOptions {
                amount: 0.5,
                lava: true,
                ..SpringOptions::default()
            })),
        ])
    }
}

/// Cave, cavern and spring carving, optionally split into weightmap-driven layers.
pub struct CavesGen {
    layers: ChannelLayers<CaveLayer>,
}

impl CavesGen {
    pub fn new(layers: ChannelLayers<CaveLayer>) -> Self {
        Self { layers }
    }

    pub fn build(table: &toml::Table, ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: CavesOptions = parse_options("caves", table)?;
        if options.weightmap.is_none() && options.layer.is_empty() {
            info!("Using default settings for cave generation");
            return Ok(GeneratorKind::Caves(Self::new(ChannelLayers::always_on(
                CaveLayer::standard(ctx.seed),
            ))));
        }

        let mut layers = Vec::with_capacity(options.layer.len());
        for (index, layer) in options.layer.iter().enumerate() {
            if layer.carvers.is_empty() {
                warn!("Cave layer {index} is defined but has no carvers");
            }
            let carvers = layer
                .carvers
                .iter()
                .enumerate()
                .map(|(i, c)| Carver::from_options(c, ctx.seed.wrapping_add((index * 16 + i) as u64)))
                .collect();
            layers.push((layer.channel, CaveLayer::new(carvers)));
        }
        let layers = ChannelLayers::load("caves", options.weightmap.as_deref(), layers, ctx)?;
        Ok(GeneratorKind::Caves(Self::new(layers)))
    }

    pub fn process_surface(
        &mut self,
        world: &mut dyn VoxelWorld,
        pos: IVec3,
        mask: f32,
        rng: &mut ChaCha8Rng,
    ) {
        self.layers.for_each_active(pos.x, pos.z, mask, |layer, strength| {
            for carver in &layer.carvers {
                carver.process_column(world, pos, strength, rng);
            }
        });
    }
}
