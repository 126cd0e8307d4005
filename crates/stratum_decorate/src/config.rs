use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stratum_shared::biome::BiomeId;
use stratum_shared::block::{registry, BlockId};
use stratum_shared::coords::Boundary;
use stratum_shared::version::GameVersion;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::generator::Priority;
use crate::structure::Structure;
use crate::weightmap::Channel;

/// The chain used when no document is supplied.
pub const DEFAULT_CHAIN: &str = include_str!("../resources/default_chain.toml");

/// Settings of one export run that generators may consult while being built.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSettings {
    pub version: GameVersion,
    pub seed: u64,
    /// Recorded in the level metadata; chunks outside the bounds stay empty.
    pub generate_void: bool,
    /// Base terrain places bedrock exactly on the floor instead of a thin noisy band.
    pub flat_bedrock: bool,
    /// Largest RGB distance at which a splatmap pixel still matches a layer color.
    pub dither_limit: u32,
    /// Append a block-distribution analysis when the chain has none.
    pub analyze_blocks: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            version: GameVersion::DEFAULT,
            seed: 0,
            generate_void: false,
            flat_bedrock: false,
            dither_limit: 255,
            analyze_blocks: false,
        }
    }
}

pub type SchematicSet = FxHashMap<String, Arc<Structure>>;

/// Everything a generator factory can see while it is being built.
pub struct BuildContext<'a> {
    pub settings: &'a ExportSettings,
    pub bounds: Boundary,
    /// Directory that relative file references resolve against.
    pub root: &'a Path,
    pub schematics: &'a SchematicSet,
    /// Seed reserved for this generator entry.
    pub seed: u64,
}

impl BuildContext<'_> {
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn version(&self) -> GameVersion {
        self.settings.version
    }
}

/// Top-level shape of a chain document.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChainDocument {
    pub seed: Option<i64>,
    #[serde(default)]
    pub schematics: BTreeMap<String, String>,
    #[serde(default)]
    pub generator: Vec<toml::Table>,
}

impl ChainDocument {
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }
}

/// A generator entry together with the directory its relative paths belong to.
pub(crate) struct Entry {
    pub kind: String,
    pub table: toml::Table,
    pub root: PathBuf,
}

/// Flattens a document into generator entries, splicing `include` entries one level deep.
///
/// Broken entries and includes are warned about and skipped.
pub(crate) fn collect_entries(
    doc: ChainDocument,
    root: &Path,
    nested: bool,
    entries: &mut Vec<Entry>,
    schematics: &mut SchematicSet,
) {
    for (key, file) in &doc.schematics {
        register_structure(schematics, key, &root.join(file));
    }

    for table in doc.generator {
        let Some(kind) = table.get("kind").and_then(|v| v.as_str()).map(str::to_owned) else {
            warn!(
                "{}",
                ConfigError::MissingField {
                    kind: "generator".to_string(),
                    field: "kind",
                }
            );
            continue;
        };

        if kind != "include" {
            entries.push(Entry {
                kind,
                table,
                root: root.to_path_buf(),
            });
            continue;
        }

        let Some(file) = table.get("file").and_then(|v| v.as_str()) else {
            warn!(
                "{}",
                ConfigError::MissingField {
                    kind,
                    field: "file",
                }
            );
            continue;
        };
        if nested {
            warn!("{}", ConfigError::RecursiveInclude(file.to_string()));
            continue;
        }

        let path = root.join(file);
        match ChainDocument::read(&path) {
            Ok(included) => {
                let include_root = path.parent().unwrap_or(root).to_path_buf();
                collect_entries(included, &include_root, true, entries, schematics);
            }
            Err(err) => warn!("Skipping include: {err}"),
        }
    }
}

fn register_structure(schematics: &mut SchematicSet, key: &str, path: &Path) {
    match Structure::load(path) {
        Ok(structure) => {
            info!("Registered structure '{key}' from {}", path.display());
            schematics.insert(key.to_string(), Arc::new(structure));
        }
        Err(err) => warn!("Failed to import structure '{key}': {err}"),
    }
}

/// Deserializes the kind-specific options of an entry; fields the type does not know are ignored.
pub fn parse_options<T: DeserializeOwned>(kind: &str, table: &toml::Table) -> Result<T, ConfigError> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|source| ConfigError::Parse {
            origin: format!("generator '{kind}'"),
            source,
        })
}

/// Options every entry accepts regardless of kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommonOptions {
    pub passes: Option<u32>,
    pub priority: Option<Priority>,
    pub mask: Option<MaskOptions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MaskOptions {
    pub file: String,
    #[serde(default)]
    pub channel: Channel,
}

pub fn resolve_block(name: &str) -> Result<BlockId, ConfigError> {
    registry()
        .get_by_name(name)
        .ok_or_else(|| ConfigError::UnknownBlock(name.to_string()))
}

pub fn resolve_biome(name: &str) -> Result<BiomeId, ConfigError> {
    BiomeId::parse(name).ok_or_else(|| ConfigError::UnknownBiome(name.to_string()))
}
