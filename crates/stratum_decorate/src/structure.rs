use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::IVec3;
use serde::Deserialize;
use stratum_shared::block::BlockId;
use stratum_shared::world::VoxelWorld;

use crate::config::resolve_block;
use crate::error::ConfigError;

/// On-disk template: `layers` run bottom-up, each row is one z line and each character one x cell.
/// `.` and spaces leave the world untouched.
#[derive(Debug, Deserialize)]
struct StructureFile {
    #[serde(default)]
    origin: [i32; 3],
    layers: Vec<Vec<String>>,
    palette: BTreeMap<String, String>,
}

/// A small block template stamped into the world, e.g. a tree or a boulder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Structure {
    blocks: Vec<(IVec3, BlockId)>,
}

impl Structure {
    pub fn from_blocks(blocks: Vec<(IVec3, BlockId)>) -> Self {
        Self { blocks }
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: StructureFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;

        let mut palette = BTreeMap::new();
        for (key, name) in &file.palette {
            let mut chars = key.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return Err(ConfigError::InvalidValue {
                    kind: "structure".to_string(),
                    field: "palette",
                    reason: format!("key '{key}' must be a single character"),
                });
            };
            palette.insert(c, resolve_block(name)?);
        }

        let offset = IVec3::from_array(file.origin);
        let mut blocks = Vec::new();
        for (y, layer) in file.layers.iter().enumerate() {
            for (z, row) in layer.iter().enumerate() {
                for (x, c) in row.chars().enumerate() {
                    if c == '.' || c == ' ' {
                        continue;
                    }
                    let block = palette.get(&c).copied().ok_or_else(|| ConfigError::InvalidValue {
                        kind: "structure".to_string(),
                        field: "layers",
                        reason: format!("character '{c}' is not in the palette"),
                    })?;
                    blocks.push((IVec3::new(x as i32, y as i32, z as i32) - offset, block));
                }
            }
        }

        Ok(Self { blocks })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn blocks(&self) -> &[(IVec3, BlockId)] {
        &self.blocks
    }

    /// Stamps the template with its origin at `base`. Returns whether any block was written.
    pub fn build(&self, world: &mut dyn VoxelWorld, base: IVec3) -> bool {
        let mut placed = false;
        for &(offset, block) in &self.blocks {
            placed |= world.set_block(base + offset, block);
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use stratum_shared::biome::BiomeId;
    use stratum_shared::block::BlockId;
    use stratum_shared::coords::Boundary;
    use stratum_shared::world::{MemoryWorld, WorldView};

    use super::Structure;
    use crate::error::ConfigError;

    const BOULDER: &str = r#"
origin = [1, 0, 1]
layers = [
    [".c.", "ccc", ".c."],
    ["...", ".m.", "..."],
]

[palette]
c = "cobblestone"
m = "mossy_cobblestone"
"#;

    #[test]
    fn layers_map_to_offsets_around_the_origin() {
        let boulder = Structure::parse(BOULDER, "boulder").expect("parse");
        assert_eq!(boulder.blocks().len(), 6);
        assert!(boulder
            .blocks()
            .contains(&(IVec3::new(0, 1, 0), BlockId(47))));
        assert!(boulder
            .blocks()
            .contains(&(IVec3::new(-1, 0, 0), BlockId(46))));
    }

    #[test]
    fn build_stamps_into_the_world() {
        let boulder = Structure::parse(BOULDER, "boulder").expect("parse");
        let mut world = MemoryWorld::with_limits(
            Boundary::from_size(0, 0, 3, 3),
            0,
            7,
            BiomeId::Plains,
        );
        assert!(boulder.build(&mut world, IVec3::new(1, 2, 1)));
        assert_eq!(world.get_block(IVec3::new(1, 3, 1)), Some(BlockId(47)));
        assert_eq!(world.get_block(IVec3::new(0, 2, 1)), Some(BlockId(46)));
        assert_eq!(world.get_block(IVec3::new(0, 2, 0)), Some(BlockId::AIR));
    }

    #[test]
    fn unknown_palette_entries_are_rejected() {
        let text = "layers = [[\"x\"]]\n[palette]\nx = \"not_a_block\"\n";
        assert!(matches!(
            Structure::parse(text, "bad"),
            Err(ConfigError::UnknownBlock(_))
        ));

        let text = "layers = [[\"y\"]]\n[palette]\nx = \"stone\"\n";
        assert!(matches!(
            Structure::parse(text, "bad"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
