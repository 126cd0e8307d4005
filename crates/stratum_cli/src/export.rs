use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rayon::ThreadPoolBuildError;
use stratum_core::events::{self, ProgressEvent};
use stratum_core::jobs::JobSystem;
use stratum_decorate::{build_base_terrain, Chain, ChainSource, ConfigError, ExportSettings};
use stratum_persist::archive::save_world;
use stratum_persist::level::LevelMeta;
use stratum_shared::biome::BiomeId;
use stratum_shared::coords::Boundary;
use stratum_shared::heightmap::Heightmap;
use stratum_shared::world::{MemoryWorld, WorldView};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub heightmap: PathBuf,
    pub chain: Option<PathBuf>,
    pub out: PathBuf,
    pub settings: ExportSettings,
    /// Use the built-in chain when no usable document is available.
    pub allow_default: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            heightmap: PathBuf::new(),
            chain: None,
            out: PathBuf::from("world"),
            settings: ExportSettings::default(),
            allow_default: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to load heightmap {}: {source}", path.display())]
    Heightmap {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    Jobs(#[from] ThreadPoolBuildError),
    #[error("failed to write world: {0}")]
    Io(#[from] io::Error),
}

/// Reads a grayscale image; each pixel's luminance is the column's surface height.
pub fn load_heightmap(path: &Path, ceiling: i32) -> Result<Heightmap, ExportError> {
    let image = image::open(path)
        .map_err(|source| ExportError::Heightmap {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    let bounds = Boundary::from_size(0, 0, image.width() as usize, image.height() as usize);
    Ok(Heightmap::from_fn(bounds, |x, z| {
        (image.get_pixel(x as u32, z as u32).0[0] as i32).min(ceiling)
    }))
}

fn build_chain(config: &ExportConfig, bounds: Boundary) -> Result<Chain, ConfigError> {
    match &config.chain {
        Some(path) => Chain::build(
            ChainSource::File(path),
            &config.settings,
            bounds,
            config.allow_default,
        ),
        None if config.allow_default => {
            Chain::build(ChainSource::Default, &config.settings, bounds, true)
        }
        None => {
            warn!("No chain document and defaults disabled; the terrain stays undecorated");
            let empty = ChainSource::Text {
                text: "",
                root: Path::new("."),
            };
            Chain::build(empty, &config.settings, bounds, false)
        }
    }
}

pub fn run(config: &ExportConfig) -> Result<(), ExportError> {
    let started = Instant::now();
    let version = config.settings.version;
    let heightmap = load_heightmap(&config.heightmap, version.ceiling())?;
    let bounds = heightmap.bounds();
    info!(
        "Exporting {}x{} columns for version {version} (seed {})",
        bounds.len_x(),
        bounds.len_z(),
        config.settings.seed
    );

    let jobs = Arc::new(JobSystem::new(None)?);
    let mut world = MemoryWorld::new(bounds, version, BiomeId::Plains);
    jobs.install(|| build_base_terrain(&mut world, &heightmap, &config.settings));

    let (tx, rx) = events::channel::<ProgressEvent>();
    let reporter = thread::spawn(move || {
        let mut stage = String::new();
        for event in rx.iter() {
            if event.stage != stage {
                info!("{}", event.stage);
                stage = event.stage;
            }
        }
    });

    let mut chain = build_chain(config, bounds)?
        .with_progress(tx)
        .with_jobs(Arc::clone(&jobs));
    chain.run(&mut world, &heightmap, bounds);

    let meta = LevelMeta {
        name: config
            .out
            .file_name()
            .map_or_else(|| "world".to_string(), |n| n.to_string_lossy().into_owned()),
        version,
        seed: config.settings.seed,
        generate_void: config.settings.generate_void,
        bounds,
        min_y: world.min_y(),
        max_y: world.max_y(),
    };
    save_world(&world, &config.out, &meta)?;
    chain.on_create_world_files(&config.out)?;
    drop(chain);
    if reporter.join().is_err() {
        warn!("Progress reporter thread panicked");
    }

    info!(
        "World written to {} in {:.1}s",
        config.out.display(),
        started.elapsed().as_secs_f32()
    );
    Ok(())
}
