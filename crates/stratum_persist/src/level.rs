use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stratum_shared::coords::Boundary;
use stratum_shared::version::GameVersion;

pub const LEVEL_FILE_NAME: &str = "level.toml";

/// World-level metadata written next to the region folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMeta {
    pub name: String,
    pub version: GameVersion,
    /// TOML integers are signed, so the seed travels as a string.
    #[serde(with = "seed_serde")]
    pub seed: u64,
    #[serde(default)]
    pub generate_void: bool,
    pub bounds: Boundary,
    pub min_y: i32,
    pub max_y: i32,
}

impl LevelMeta {
    pub fn save(&self, world_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(world_dir)?;

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize level metadata: {e}"),
            )
        })?;

        fs::write(world_dir.join(LEVEL_FILE_NAME), toml_string)
    }

    pub fn load(world_dir: &Path) -> io::Result<Option<Self>> {
        let meta_path = world_dir.join(LEVEL_FILE_NAME);
        if !meta_path.exists() {
            return Ok(None);
        }

        let toml_string = fs::read_to_string(meta_path)?;
        let meta = toml::from_str(&toml_string).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize level metadata: {e}"),
            )
        })?;

        Ok(Some(meta))
    }
}

mod seed_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSeed {
            Int(i64),
            Text(String),
        }

        match RawSeed::deserialize(deserializer)? {
            RawSeed::Int(value) => {
                u64::try_from(value).map_err(|_| de::Error::custom("seed must be non-negative"))
            }
            RawSeed::Text(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| de::Error::custom("invalid seed string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use stratum_shared::coords::Boundary;
    use stratum_shared::version::GameVersion;

    use super::{LevelMeta, LEVEL_FILE_NAME};

    fn sample() -> LevelMeta {
        LevelMeta {
            name: "valley".to_string(),
            version: GameVersion::release(18),
            seed: u64::MAX - 7,
            generate_void: false,
            bounds: Boundary::from_size(-16, 0, 32, 16),
            min_y: -64,
            max_y: 319,
        }
    }

    #[test]
    fn saved_metadata_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let meta = sample();
        meta.save(dir.path()).expect("save level");

        let loaded = LevelMeta::load(dir.path())
            .expect("load level")
            .expect("level file present");
        assert_eq!(loaded, meta);
    }

    #[test]
    fn missing_level_file_is_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(LevelMeta::load(dir.path()).expect("load level").is_none());
    }

    #[test]
    fn integer_seeds_are_accepted() {
        let dir = tempfile::tempdir().expect("temp dir");
        let text = toml::to_string_pretty(&sample())
            .expect("serialize")
            .replace(&format!("\"{}\"", u64::MAX - 7), "42");
        fs::write(dir.path().join(LEVEL_FILE_NAME), text).expect("write level");

        let loaded = LevelMeta::load(dir.path())
            .expect("load level")
            .expect("level file present");
        assert_eq!(loaded.seed, 42);
    }
}
