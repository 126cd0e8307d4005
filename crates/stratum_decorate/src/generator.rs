use std::io;
use std::path::Path;

use glam::IVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stratum_shared::coords::{Boundary, RegionPos};
use stratum_shared::version::GameVersion;
use stratum_shared::world::{VoxelWorld, WorldView};

use crate::generators::analysis::AnalysisGen;
use crate::generators::bedrock::BedrockGen;
use crate::generators::caves::CavesGen;
use crate::generators::merger::MergerGen;
use crate::generators::natural::NaturalGen;
use crate::generators::ores::OresGen;
use crate::generators::snow::SnowGen;
use crate::generators::splat::SplatGen;
use crate::generators::thaw::ThawGen;
use crate::generators::torches::TorchGen;
use crate::generators::vegetation::VegetationGen;
use crate::generators::water::WaterGen;
use crate::weightmap::Weightmap;

/// Execution order of generators. Lower values run first; ties keep declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    First,
    AfterFirst,
    BeforeDefault,
    Default,
    AfterDefault,
    BeforeLast,
    Last,
}

/// Which sweeps the chain performs for a generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProcessMode {
    RegionOnly,
    Block,
    Surface,
    Both,
}

impl ProcessMode {
    pub fn visits_blocks(self) -> bool {
        matches!(self, ProcessMode::Block | ProcessMode::Both)
    }

    pub fn visits_surface(self) -> bool {
        matches!(self, ProcessMode::Surface | ProcessMode::Both)
    }
}

/// A scalar weightmap anchored at the decorated area's corner.
#[derive(Clone, Debug)]
pub struct Mask {
    map: Weightmap,
    origin_x: i32,
    origin_z: i32,
}

impl Mask {
    pub fn new(map: Weightmap, bounds: Boundary) -> Self {
        Self {
            map,
            origin_x: bounds.x_min,
            origin_z: bounds.z_min,
        }
    }

    pub fn sample(&self, x: i32, z: i32) -> f32 {
        self.map.get(x - self.origin_x, z - self.origin_z)
    }
}

/// The decoration algorithms. Each variant owns its tunables; the shared contract lives on [`Generator`].
pub enum GeneratorKind {
    Bedrock(BedrockGen),
    Caves(CavesGen),
    Ores(OresGen),
    Splat(SplatGen),
    Snow(SnowGen),
    Thaw(ThawGen),
    Natural(NaturalGen),
    Vegetation(VegetationGen),
    Torches(TorchGen),
    Water(WaterGen),
    Merger(MergerGen),
    Analysis(AnalysisGen),
}

impl GeneratorKind {
    pub fn priority(&self) -> Priority {
        match self {
            GeneratorKind::Bedrock(_) => Priority::First,
            GeneratorKind::Caves(_) => Priority::AfterFirst,
            GeneratorKind::Natural(_) => Priority::BeforeDefault,
            GeneratorKind::Vegetation(_) | GeneratorKind::Torches(_) => Priority::AfterDefault,
            GeneratorKind::Merger(_) => Priority::Last,
            GeneratorKind::Ores(_)
            | GeneratorKind::Splat(_)
            | GeneratorKind::Snow(_)
            | GeneratorKind::Thaw(_)
            | GeneratorKind::Water(_)
            | GeneratorKind::Analysis(_) => Priority::Default,
        }
    }

    pub fn mode(&self) -> ProcessMode {
        match self {
            GeneratorKind::Bedrock(_) => ProcessMode::Block,
            GeneratorKind::Thaw(_) | GeneratorKind::Natural(_) => ProcessMode::Both,
            GeneratorKind::Analysis(_) => ProcessMode::RegionOnly,
            _ => ProcessMode::Surface,
        }
    }

    /// Vertical range swept by block passes.
    pub fn block_range(&self, version: GameVersion) -> (i32, i32) {
        match self {
            GeneratorKind::Bedrock(gen) => gen.band(version.floor()),
            _ => (version.floor(), version.ceiling()),
        }
    }
}

/// One configured decoration step: an algorithm plus its schedule, mask and random stream.
pub struct Generator {
    name: String,
    priority: Priority,
    mode: ProcessMode,
    y_min: i32,
    y_max: i32,
    passes: u32,
    mask: Option<Mask>,
    rng: ChaCha8Rng,
    kind: GeneratorKind,
}

impl Generator {
    pub fn new(name: impl Into<String>, kind: GeneratorKind, version: GameVersion, seed: u64) -> Self {
        let (y_min, y_max) = kind.block_range(version);
        Self {
            name: name.into(),
            priority: kind.priority(),
            mode: kind.mode(),
            y_min,
            y_max,
            passes: 1,
            mask: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            kind,
        }
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes.max(1);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn mode(&self) -> ProcessMode {
        self.mode
    }

    pub fn block_range(&self) -> (i32, i32) {
        (self.y_min, self.y_max)
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn kind(&self) -> &GeneratorKind {
        &self.kind
    }

    fn mask_at(&self, x: i32, z: i32) -> f32 {
        self.mask.as_ref().map_or(1.0, |mask| mask.sample(x, z))
    }

    /// Runs the block hook unless the mask is zero at this column.
    pub fn process_block(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, _pass: u32) {
        let mask = self.mask_at(pos.x, pos.z);
        if mask <= 0.0 {
            return;
        }
        let rng = &mut self.rng;
        match &mut self.kind {
            GeneratorKind::Bedrock(gen) => gen.process_block(world, pos, rng),
            GeneratorKind::Thaw(gen) => gen.process_block(world, pos),
            GeneratorKind::Natural(gen) => gen.process_block(world, pos),
            _ => {}
        }
    }

    /// Runs the surface hook with `pos.y` at the column's heightmap value.
    pub fn process_surface(&mut self, world: &mut dyn VoxelWorld, pos: IVec3, _pass: u32) {
        let mask = self.mask_at(pos.x, pos.z);
        if mask <= 0.0 {
            return;
        }
        let rng = &mut self.rng;
        match &mut self.kind {
            GeneratorKind::Caves(gen) => gen.process_surface(world, pos, mask, rng),
            GeneratorKind::Ores(gen) => gen.process_surface(world, pos, mask, rng),
            GeneratorKind::Splat(gen) => gen.process_surface(world, pos, rng),
            GeneratorKind::Snow(gen) => gen.process_surface(world, pos, mask, rng),
            GeneratorKind::Thaw(gen) => gen.process_surface(world, pos),
            GeneratorKind::Natural(gen) => gen.process_surface(world, pos),
            GeneratorKind::Vegetation(gen) => gen.process_surface(world, pos, rng),
            GeneratorKind::Torches(gen) => gen.process_surface(world, pos, rng),
            GeneratorKind::Water(gen) => gen.process_surface(world, pos),
            GeneratorKind::Merger(gen) => gen.process_surface(world, pos, mask, rng),
            GeneratorKind::Bedrock(_) | GeneratorKind::Analysis(_) => {}
        }
    }

    /// Read-only per-region hook; called from worker threads.
    pub fn process_region(&self, world: &dyn WorldView, region: RegionPos, _pass: u32) {
        if let GeneratorKind::Analysis(gen) = &self.kind {
            gen.process_region(world, region);
        }
    }

    pub fn on_finish(&mut self, world: &dyn WorldView) {
        if let GeneratorKind::Analysis(gen) = &mut self.kind {
            gen.on_finish(world);
        }
    }

    pub fn on_create_world_files(&self, world_dir: &Path) -> io::Result<()> {
        match &self.kind {
            GeneratorKind::Analysis(gen) => gen.write_report(world_dir),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::Boundary;
    use stratum_shared::version::GameVersion;
    use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};

    use super::{Generator, GeneratorKind, Mask, Priority, ProcessMode};
    use crate::generators::bedrock::BedrockGen;
    use crate::generators::torches::TorchGen;
    use crate::weightmap::Weightmap;

    #[test]
    fn priorities_are_ordered_first_to_last() {
        assert!(Priority::First < Priority::AfterFirst);
        assert!(Priority::AfterFirst < Priority::BeforeDefault);
        assert!(Priority::BeforeDefault < Priority::Default);
        assert!(Priority::Default < Priority::AfterDefault);
        assert!(Priority::AfterDefault < Priority::BeforeLast);
        assert!(Priority::BeforeLast < Priority::Last);
    }

    #[test]
    fn bedrock_defaults_follow_the_world_floor() {
        let gen = Generator::new(
            "bedrock",
            GeneratorKind::Bedrock(BedrockGen::new(false)),
            GameVersion::release(18),
            1,
        );
        assert_eq!(gen.priority(), Priority::First);
        assert_eq!(gen.mode(), ProcessMode::Block);
        assert_eq!(gen.block_range(), (-64, -61));
        assert_eq!(gen.passes(), 1);

        let flat = Generator::new(
            "bedrock",
            GeneratorKind::Bedrock(BedrockGen::new(true)),
            GameVersion::release(16),
            1,
        );
        assert_eq!(flat.block_range(), (0, 0));
    }

    #[test]
    fn zero_mask_short_circuits_the_hook() {
        let bounds = Boundary::from_size(10, 20, 2, 1);
        let mut world = MemoryWorld::with_limits(bounds, 0, 15, BiomeId::Plains);
        world.set_block(IVec3::new(10, 4, 20), BlockId::STONE);
        world.set_block(IVec3::new(11, 4, 20), BlockId::STONE);

        let mask = Weightmap::from_fn(2, 1, |lx, _| if lx == 0 { 0.0 } else { 1.0 });
        let mut gen = Generator::new(
            "torches",
            GeneratorKind::Torches(TorchGen::new(1.0)),
            GameVersion::release(16),
            7,
        )
        .with_mask(Mask::new(mask, bounds));

        gen.process_surface(&mut world, IVec3::new(10, 4, 20), 1);
        gen.process_surface(&mut world, IVec3::new(11, 4, 20), 1);

        assert_eq!(world.get_block(IVec3::new(10, 5, 20)), Some(BlockId::AIR));
        assert_eq!(world.get_block(IVec3::new(11, 5, 20)), Some(BlockId::TORCH));
    }
}
