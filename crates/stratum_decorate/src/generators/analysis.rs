use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use bitflags::bitflags;
use glam::IVec3;
use serde::Deserialize;
use stratum_shared::block::{BlockFlags, BlockId};
use stratum_shared::coords::RegionPos;
use stratum_shared::world::WorldView;
use tracing::info;

use crate::config::{parse_options, BuildContext};
use crate::error::ConfigError;
use crate::generator::GeneratorKind;

pub const REPORT_FILE_NAME: &str = "analysis.csv";

bitflags! {
    /// Block categories the analysis counts.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TargetBlocks: u32 {
        const ORES = 1;
        const AIR_AND_LIQUIDS = 1 << 1;
        const STONE_FAMILY = 1 << 2;
    }
}

impl TargetBlocks {
    fn matches(self, block: BlockId) -> bool {
        let props = block.properties();
        (self.contains(Self::ORES) && props.flags.contains(BlockFlags::ORE))
            || (self.contains(Self::AIR_AND_LIQUIDS)
                && (block.is_air() || props.flags.contains(BlockFlags::LIQUID)))
            || (self.contains(Self::STONE_FAMILY) && props.flags.contains(BlockFlags::STONE_FAMILY))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct AnalysisOptions {
    y_min: i32,
    y_max: i32,
    types: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            y_min: -64,
            y_max: 320,
            types: (TargetBlocks::ORES | TargetBlocks::AIR_AND_LIQUIDS).bits(),
        }
    }
}

/// Per-height block counts.
#[derive(Debug, Default)]
struct Tally {
    columns: u64,
    counts: BTreeMap<BlockId, Vec<u64>>,
}

/// Counts selected block categories per height across all regions and reports them as CSV.
pub struct AnalysisGen {
    y_min: i32,
    y_max: i32,
    targets: TargetBlocks,
    tally: Mutex<Tally>,
}

impl AnalysisGen {
    pub fn new(y_min: i32, y_max: i32, targets: TargetBlocks) -> Self {
        Self {
            y_min,
            y_max,
            targets,
            tally: Mutex::new(Tally::default()),
        }
    }

    pub fn build(table: &toml::Table, _ctx: &BuildContext) -> Result<GeneratorKind, ConfigError> {
        let options: AnalysisOptions = parse_options("analysis", table)?;
        if options.y_min > options.y_max {
            return Err(ConfigError::InvalidValue {
                kind: "analysis".to_string(),
                field: "y-min",
                reason: format!("{} is above y-max {}", options.y_min, options.y_max),
            });
        }
        Ok(GeneratorKind::Analysis(Self::new(
            options.y_min,
            options.y_max,
            TargetBlocks::from_bits_truncate(options.types),
        )))
    }

    fn rows(&self) -> usize {
        (self.y_max - self.y_min + 1) as usize
    }

    /// Safe to call from several worker threads at once.
    pub fn process_region(&self, world: &dyn WorldView, region: RegionPos) {
        let Some(area) = region.bounds().intersect(&world.bounds()) else {
            return;
        };
        let bottom = self.y_min.max(world.min_y());
        let top = self.y_max.min(world.max_y());

        let mut local = Tally::default();
        for x in area.x_min..=area.x_max {
            for z in area.z_min..=area.z_max {
                local.columns += 1;
                for y in bottom..=top {
                    let Some(block) = world.get_block(IVec3::new(x, y, z)) else {
                        continue;
                    };
                    if self.targets.matches(block) {
                        let rows = self.rows();
                        local.counts.entry(block).or_insert_with(|| vec![0; rows])
                            [(y - self.y_min) as usize] += 1;
                    }
                }
            }
        }

        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.columns += local.columns;
        for (block, counts) in local.counts {
            let rows = self.rows();
            let merged = tally.counts.entry(block).or_insert_with(|| vec![0; rows]);
            for (total, count) in merged.iter_mut().zip(counts) {
                *total += count;
            }
        }
    }

    pub fn on_finish(&mut self, _world: &dyn WorldView) {
        let tally = self.tally.get_mut().unwrap_or_else(PoisonError::into_inner);
        let mut summary = format!("Analyzed {} columns", tally.columns);
        for (block, counts) in &tally.counts {
            let total: u64 = counts.iter().sum();
            let _ = write!(summary, ", {}: {total}", block.properties().name);
        }
        info!("{summary}");
    }

    /// Total count of `block` at height `y`.
    pub fn count(&self, block: BlockId, y: i32) -> u64 {
        if y < self.y_min || y > self.y_max {
            return 0;
        }
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally
            .counts
            .get(&block)
            .map_or(0, |counts| counts[(y - self.y_min) as usize])
    }

    pub fn columns(&self) -> u64 {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner).columns
    }

    fn to_csv(&self) -> String {
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        let mut csv = String::from("y");
        for block in tally.counts.keys() {
            csv.push(',');
            csv.push_str(&block.properties().state_name());
        }
        csv.push('\n');
        for y in (self.y_min..=self.y_max).rev() {
            let row = (y - self.y_min) as usize;
            let _ = write!(csv, "{y}");
            for counts in tally.counts.values() {
                let _ = write!(csv, ",{}", counts[row]);
            }
            csv.push('\n');
        }
        csv
    }

    pub fn write_report(&self, world_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(world_dir)?;
        let path = world_dir.join(REPORT_FILE_NAME);
        fs::write(&path, self.to_csv())?;
        info!("Analysis results written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use glam::IVec3;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::Boundary;
    use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};

    use super::{AnalysisGen, TargetBlocks, REPORT_FILE_NAME};

    fn sample_world() -> MemoryWorld {
        let bounds = Boundary::from_size(0, 0, 2, 2);
        let mut world = MemoryWorld::with_limits(bounds, 0, 7, BiomeId::Plains);
        for x in 0..2 {
            for z in 0..2 {
                for y in 0..4 {
                    world.set_block(IVec3::new(x, y, z), BlockId::STONE);
                }
            }
        }
        world.set_block(IVec3::new(1, 2, 1), BlockId::COAL_ORE);
        world.set_block(IVec3::new(0, 3, 0), BlockId::WATER);
        world
    }

    #[test]
    fn counts_only_the_selected_categories() {
        let world = sample_world();
        let mut gen = AnalysisGen::new(0, 7, TargetBlocks::ORES);
        for region in world.regions() {
            gen.process_region(&world, region);
        }
        gen.on_finish(&world);

        assert_eq!(gen.columns(), 4);
        assert_eq!(gen.count(BlockId::COAL_ORE, 2), 1);
        assert_eq!(gen.count(BlockId::WATER, 3), 0);
        assert_eq!(gen.count(BlockId::STONE, 0), 0);
    }

    #[test]
    fn report_lists_heights_top_down() {
        let world = sample_world();
        let gen = AnalysisGen::new(2, 4, TargetBlocks::ORES | TargetBlocks::AIR_AND_LIQUIDS);
        for region in world.regions() {
            gen.process_region(&world, region);
        }

        let dir = tempfile::tempdir().expect("temp dir");
        gen.write_report(dir.path()).expect("write report");
        let csv = fs::read_to_string(dir.path().join(REPORT_FILE_NAME)).expect("read report");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "y,air,water,coal_ore");
        assert_eq!(lines[1], "4,4,0,0");
        assert_eq!(lines[2], "3,0,1,0");
        assert_eq!(lines[3], "2,0,0,1");
    }
}
