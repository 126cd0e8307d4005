use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::IVec3;
use stratum_shared::coords::world_to_region;
use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};
use tracing::info;

use crate::level::LevelMeta;
use crate::region::RegionFile;

pub const REGION_DIR_NAME: &str = "region";

pub fn region_dir(world_dir: &Path) -> PathBuf {
    world_dir.join(REGION_DIR_NAME)
}

/// Writes every column of `world` into region files plus `level.toml`.
pub fn save_world(world: &MemoryWorld, world_dir: &Path, meta: &LevelMeta) -> io::Result<()> {
    let bounds = world.bounds();
    let dir = region_dir(world_dir);
    fs::create_dir_all(&dir)?;

    for region in world.regions() {
        let Some(clipped) = region.bounds().intersect(&bounds) else {
            continue;
        };

        let mut file = RegionFile::create(&dir, region, world.min_y(), world.max_y());
        for x in clipped.x_min..=clipped.x_max {
            for z in clipped.z_min..=clipped.z_max {
                if let Some(column) = world.column(x, z) {
                    file.save_column(x, z, column);
                }
            }
        }
        for pos in world.pending_ticks() {
            if world_to_region(pos.x, pos.z) == region {
                file.add_tick(pos.to_array());
            }
        }
        file.flush()?;
    }

    meta.save(world_dir)?;
    info!(
        "Saved {} regions to {}",
        world.regions().len(),
        world_dir.display()
    );
    Ok(())
}

/// Reads a world written by [`save_world`]. Every column inside the recorded bounds must be present.
pub fn load_world(world_dir: &Path) -> io::Result<(MemoryWorld, LevelMeta)> {
    let meta = LevelMeta::load(world_dir)?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no level metadata in {}", world_dir.display()),
        )
    })?;

    let bounds = meta.bounds;
    let dir = region_dir(world_dir);
    let mut slots = vec![None; bounds.len_x() * bounds.len_z()];
    let mut ticks = Vec::new();

    for region in bounds.regions() {
        let path = dir.join(RegionFile::file_name(region));
        let file = RegionFile::open(&path)?;
        if file.limits() != (meta.min_y, meta.max_y) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "region {} has limits {:?}; level expects ({}, {})",
                    path.display(),
                    file.limits(),
                    meta.min_y,
                    meta.max_y
                ),
            ));
        }
        for ((x, z), column) in file.columns() {
            if let Some(index) = bounds.column_index(x, z) {
                slots[index] = Some(column.clone());
            }
        }
        ticks.extend(file.ticks().iter().map(|&pos| IVec3::from_array(pos)));
    }

    let columns = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("archive is missing column #{index} of {bounds:?}"),
                )
            })
        })
        .collect::<io::Result<Vec<_>>>()?;

    let mut world = MemoryWorld::from_columns(bounds, meta.min_y, meta.max_y, columns)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    for pos in ticks {
        world.mark_for_tick_update(pos);
    }

    Ok((world, meta))
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::{Boundary, REGION_SIZE};
    use stratum_shared::version::GameVersion;
    use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};

    use super::{load_world, region_dir, save_world};
    use crate::level::LevelMeta;

    #[test]
    fn world_spanning_two_regions_survives_save_and_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let bounds = Boundary::from_size(REGION_SIZE - 2, 0, 4, 2);
        let mut world = MemoryWorld::with_limits(bounds, 0, 7, BiomeId::Desert);
        world.set_block(IVec3::new(REGION_SIZE - 2, 3, 0), BlockId::SAND);
        world.set_block(IVec3::new(REGION_SIZE + 1, 5, 1), BlockId::WATER);
        world.set_biome(REGION_SIZE, 1, BiomeId::River);
        world.mark_for_tick_update(IVec3::new(REGION_SIZE + 1, 5, 1));

        let meta = LevelMeta {
            name: "split".to_string(),
            version: GameVersion::release(16),
            seed: 9,
            generate_void: false,
            bounds,
            min_y: 0,
            max_y: 7,
        };
        save_world(&world, dir.path(), &meta).expect("save world");
        assert_eq!(
            std::fs::read_dir(region_dir(dir.path()))
                .expect("region dir")
                .count(),
            2
        );

        let (loaded, loaded_meta) = load_world(dir.path()).expect("load world");
        assert_eq!(loaded_meta, meta);
        assert_eq!(loaded.columns(), world.columns());
        assert_eq!(loaded.get_biome(REGION_SIZE, 1), Some(BiomeId::River));
        assert_eq!(
            loaded.pending_ticks(),
            &[IVec3::new(REGION_SIZE + 1, 5, 1)]
        );
    }

    #[test]
    fn loading_without_metadata_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_world(dir.path()).err().expect("must fail");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
