use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stratum_shared::column::Column;
use stratum_shared::coords::{world_to_region, RegionPos};
use tracing::debug;

pub const REGION_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct RegionDisk {
    format_version: u32,
    region: RegionPos,
    min_y: i32,
    max_y: i32,
    columns: Vec<((i32, i32), Column)>,
    ticks: Vec<[i32; 3]>,
}

/// One region's worth of columns, stored as zstd-compressed bincode.
pub struct RegionFile {
    path: PathBuf,
    region: RegionPos,
    min_y: i32,
    max_y: i32,
    columns: BTreeMap<(i32, i32), Column>,
    ticks: Vec<[i32; 3]>,
}

impl RegionFile {
    pub const MAGIC: [u8; 4] = *b"STRR";
    const WIRE_VERSION_ZSTD: u8 = 1;
    const COMPRESSION_LEVEL: i32 = 3;

    pub fn file_name(region: RegionPos) -> String {
        format!("r.{}.{}.str", region.x, region.z)
    }

    pub fn create(dir: &Path, region: RegionPos, min_y: i32, max_y: i32) -> Self {
        Self {
            path: dir.join(Self::file_name(region)),
            region,
            min_y,
            max_y,
            columns: BTreeMap::new(),
            ticks: Vec::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;

        if bytes.len() < Self::MAGIC.len() + 1 || bytes[..4] != Self::MAGIC[..] {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid region file magic; expected STRR",
            ));
        }

        let wire_version = bytes[Self::MAGIC.len()];
        if wire_version != Self::WIRE_VERSION_ZSTD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported region wire format version {wire_version}; expected 1"),
            ));
        }

        let decompressed = zstd::stream::decode_all(&bytes[Self::MAGIC.len() + 1..]).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to decompress region payload: {err}"),
            )
        })?;
        let disk: RegionDisk = bincode::deserialize(&decompressed).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to decode region payload: {err}"),
            )
        })?;
        if disk.format_version != REGION_FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unsupported region format version {}; current version is {REGION_FORMAT_VERSION}",
                    disk.format_version
                ),
            ));
        }

        debug!(
            "Loaded region {:?} with {} columns from {}",
            disk.region,
            disk.columns.len(),
            path.display()
        );

        Ok(Self {
            path,
            region: disk.region,
            min_y: disk.min_y,
            max_y: disk.max_y,
            columns: disk.columns.into_iter().collect(),
            ticks: disk.ticks,
        })
    }

    pub fn region(&self) -> RegionPos {
        self.region
    }

    pub fn limits(&self) -> (i32, i32) {
        (self.min_y, self.max_y)
    }

    /// Stores a column; panics if the column lies outside this region.
    pub fn save_column(&mut self, x: i32, z: i32, column: &Column) {
        assert_eq!(
            world_to_region(x, z),
            self.region,
            "column [{x},{z}] does not belong to region {:?}",
            self.region
        );
        self.columns.insert((x, z), column.clone());
    }

    pub fn load_column(&self, x: i32, z: i32) -> Option<&Column> {
        self.columns.get(&(x, z))
    }

    pub fn add_tick(&mut self, pos: [i32; 3]) {
        self.ticks.push(pos);
    }

    pub fn ticks(&self) -> &[[i32; 3]] {
        &self.ticks
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = ((i32, i32), &Column)> {
        self.columns.iter().map(|(pos, column)| (*pos, column))
    }

    pub fn flush(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let disk = RegionDisk {
            format_version: REGION_FORMAT_VERSION,
            region: self.region,
            min_y: self.min_y,
            max_y: self.max_y,
            columns: self
                .columns
                .iter()
                .map(|(pos, column)| (*pos, column.clone()))
                .collect(),
            ticks: self.ticks.clone(),
        };

        let encoded = bincode::serialize(&disk).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to encode region payload: {err}"),
            )
        })?;
        let compressed = zstd::stream::encode_all(encoded.as_slice(), Self::COMPRESSION_LEVEL)?;
        let mut bytes = Vec::with_capacity(Self::MAGIC.len() + 1 + compressed.len());
        bytes.extend_from_slice(&Self::MAGIC);
        bytes.push(Self::WIRE_VERSION_ZSTD);
        bytes.extend_from_slice(&compressed);

        fs::write(&self.path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::column::Column;
    use stratum_shared::coords::RegionPos;

    use super::RegionFile;

    #[test]
    fn flushed_region_reopens_with_the_same_columns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let region = RegionPos { x: -1, z: 0 };
        let mut file = RegionFile::create(dir.path(), region, 0, 15);

        let mut column = Column::new_empty(16, BiomeId::Forest);
        column.set(0, BlockId::BEDROCK);
        column.set(4, BlockId::GRASS_BLOCK);
        file.save_column(-5, 7, &column);
        file.add_tick([-5, 3, 7]);
        file.flush().expect("flush region");

        let reopened =
            RegionFile::open(dir.path().join(RegionFile::file_name(region))).expect("open region");
        assert_eq!(reopened.region(), region);
        assert_eq!(reopened.limits(), (0, 15));
        assert_eq!(reopened.column_count(), 1);
        assert_eq!(reopened.load_column(-5, 7), Some(&column));
        assert_eq!(reopened.ticks(), &[[-5, 3, 7]]);
    }

    #[test]
    fn rejects_files_without_magic() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.str");
        fs::write(&path, b"nope-not-a-region").expect("write file");

        let err = RegionFile::open(&path).err().expect("must fail");
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn columns_outside_the_region_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut file = RegionFile::create(dir.path(), RegionPos { x: 0, z: 0 }, 0, 3);
        file.save_column(600, 0, &Column::new_empty(4, BiomeId::Plains));
    }
}
