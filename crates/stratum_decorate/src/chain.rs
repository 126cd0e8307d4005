use std::io;
use std::path::Path;
use std::sync::Arc;

use glam::IVec3;
use rayon::prelude::*;
use stratum_core::events::{EventSender, ProgressEvent};
use stratum_core::jobs::JobSystem;
use stratum_shared::coords::Boundary;
use stratum_shared::heightmap::Heightmap;
use stratum_shared::world::VoxelWorld;
use tracing::{debug, info, warn};

use crate::config::{
    collect_entries, BuildContext, ChainDocument, ExportSettings, SchematicSet, DEFAULT_CHAIN,
};
use crate::error::ConfigError;
use crate::generator::{Generator, GeneratorKind};
use crate::registry::GeneratorRegistry;

/// Where a chain document comes from. Relative paths inside it resolve against its directory.
#[derive(Clone, Copy, Debug)]
pub enum ChainSource<'a> {
    /// The built-in chain.
    Default,
    File(&'a Path),
    Text { text: &'a str, root: &'a Path },
}

/// Spreads entry seeds apart so neighbouring entries do not share random streams.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

fn entry_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64 + 1).wrapping_mul(SEED_STRIDE))
}

/// Priority-ordered generators and the sweeps that drive them over a world.
pub struct Chain {
    generators: Vec<Generator>,
    progress: Option<EventSender<ProgressEvent>>,
    jobs: Option<Arc<JobSystem>>,
}

impl Chain {
    /// Orders generators by priority; equal priorities keep their given order.
    pub fn new(mut generators: Vec<Generator>) -> Self {
        generators.sort_by_key(Generator::priority);
        Self {
            generators,
            progress: None,
            jobs: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_progress(mut self, sender: EventSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Region passes run on this pool instead of the global rayon pool.
    pub fn with_jobs(mut self, jobs: Arc<JobSystem>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Builds a chain with the built-in registry.
    ///
    /// A document that cannot be read or parsed falls back to the built-in chain when
    /// `allow_default` is set and is an error otherwise. Individual entries that fail to build
    /// are warned about and skipped.
    pub fn build(
        source: ChainSource<'_>,
        settings: &ExportSettings,
        bounds: Boundary,
        allow_default: bool,
    ) -> Result<Self, ConfigError> {
        Self::build_with(&GeneratorRegistry::with_builtin(), source, settings, bounds, allow_default)
    }

    pub fn build_with(
        registry: &GeneratorRegistry,
        source: ChainSource<'_>,
        settings: &ExportSettings,
        bounds: Boundary,
        allow_default: bool,
    ) -> Result<Self, ConfigError> {
        let here = Path::new(".");
        let parsed = match source {
            ChainSource::Default => {
                ChainDocument::parse(DEFAULT_CHAIN, "default chain").map(|doc| (doc, here))
            }
            ChainSource::File(path) => ChainDocument::read(path)
                .map(|doc| (doc, path.parent().unwrap_or(here))),
            ChainSource::Text { text, root } => {
                ChainDocument::parse(text, "chain document").map(|doc| (doc, root))
            }
        };

        let (doc, root) = match parsed {
            Ok(parsed) => parsed,
            Err(err) if allow_default && !matches!(source, ChainSource::Default) => {
                warn!("{err}; falling back to the default chain");
                (ChainDocument::parse(DEFAULT_CHAIN, "default chain")?, here)
            }
            Err(err) => return Err(err),
        };

        let seed = doc.seed.map_or(settings.seed, |seed| seed as u64);
        let mut entries = Vec::new();
        let mut schematics = SchematicSet::default();
        collect_entries(doc, root, false, &mut entries, &mut schematics);

        let mut generators = Vec::with_capacity(entries.len() + 1);
        for (index, entry) in entries.iter().enumerate() {
            let ctx = BuildContext {
                settings,
                bounds,
                root: &entry.root,
                schematics: &schematics,
                seed: entry_seed(seed, index),
            };
            match registry.create(&entry.kind, &entry.table, &ctx) {
                Ok(generator) => generators.push(generator),
                Err(err) => warn!("Skipping generator '{}': {err}", entry.kind),
            }
        }

        let has_analysis = generators
            .iter()
            .any(|g| matches!(g.kind(), GeneratorKind::Analysis(_)));
        if settings.analyze_blocks && !has_analysis {
            let ctx = BuildContext {
                settings,
                bounds,
                root,
                schematics: &schematics,
                seed: entry_seed(seed, entries.len()),
            };
            match registry.create("analysis", &toml::Table::new(), &ctx) {
                Ok(generator) => generators.push(generator),
                Err(err) => warn!("Skipping block analysis: {err}"),
            }
        }

        info!("Built generator chain with {} generators", generators.len());
        Ok(Self::new(generators))
    }

    /// Runs every generator over `bounds`, pass by pass, then calls their finish hooks.
    ///
    /// Block and surface sweeps go one X-slice at a time in ascending order; later columns may
    /// rely on earlier columns of the same pass having been processed. Region sweeps run in
    /// parallel and only read the world.
    pub fn run<W: VoxelWorld>(&mut self, world: &mut W, heightmap: &Heightmap, bounds: Boundary) {
        let count = self.generators.len();
        let slices = bounds.len_x() as f32;

        for index in 0..count {
            let passes = self.generators[index].passes();
            for pass in 1..=passes {
                let generator = &mut self.generators[index];
                let pass_info = if passes > 1 {
                    format!(" Pass {pass}/{passes}")
                } else {
                    String::new()
                };
                let name = generator.name().to_string();
                let label =
                    |title: &str| format!("{}/{count} {title} [{name}{pass_info}]", index + 1);

                if generator.mode().visits_blocks() {
                    let title = label("Decorating terrain");
                    let (y_min, y_max) = generator.block_range();
                    for (i, x) in (bounds.x_min..=bounds.x_max).enumerate() {
                        for z in bounds.z_min..=bounds.z_max {
                            for y in y_min..=y_max {
                                generator.process_block(world, IVec3::new(x, y, z), pass);
                            }
                        }
                        report(&self.progress, &title, pass, passes, (i + 1) as f32 / slices);
                    }
                }

                if generator.mode().visits_surface() {
                    let title = label("Decorating surface");
                    for (i, x) in (bounds.x_min..=bounds.x_max).enumerate() {
                        for z in bounds.z_min..=bounds.z_max {
                            let y = heightmap.get(x, z);
                            generator.process_surface(world, IVec3::new(x, y, z), pass);
                        }
                        report(&self.progress, &title, pass, passes, (i + 1) as f32 / slices);
                    }
                }

                let generator = &self.generators[index];
                let view: &W = &*world;
                let regions = view.regions();
                let sweep = || {
                    regions
                        .par_iter()
                        .for_each(|&region| generator.process_region(view, region, pass));
                };
                match &self.jobs {
                    Some(jobs) => jobs.install(sweep),
                    None => sweep(),
                }
            }
        }

        for generator in &mut self.generators {
            generator.on_finish(&*world);
        }
    }

    /// Lets generators write side files next to a saved world.
    pub fn on_create_world_files(&self, world_dir: &Path) -> io::Result<()> {
        for generator in &self.generators {
            generator.on_create_world_files(world_dir)?;
        }
        Ok(())
    }
}

fn report(
    progress: &Option<EventSender<ProgressEvent>>,
    title: &str,
    pass: u32,
    passes: u32,
    fraction: f32,
) {
    let overall = ((pass - 1) as f32 + fraction) / passes as f32;
    debug!("{title} {:.0}%", overall * 100.0);
    if let Some(sender) = progress {
        sender.send(ProgressEvent::new(title, overall));
    }
}
