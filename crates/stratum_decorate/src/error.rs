use std::path::PathBuf;

/// Failure to build a generator or a chain from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration or data file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or an entry did not match the expected TOML shape.
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown generator kind '{0}'")]
    UnknownKind(String),

    #[error("{kind}: missing required field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("{kind}: invalid value for '{field}': {reason}")]
    InvalidValue {
        kind: String,
        field: &'static str,
        reason: String,
    },

    #[error("unknown block '{0}'")]
    UnknownBlock(String),

    #[error("unknown biome '{0}'")]
    UnknownBiome(String),

    #[error("include '{0}' appears inside an included document; includes nest one level only")]
    RecursiveInclude(String),

    #[error(transparent)]
    Weightmap(#[from] WeightmapError),
}

/// Failure to load a raster used as a mask, splatmap or water surface.
#[derive(Debug, thiserror::Error)]
pub enum WeightmapError {
    #[error("failed to load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "image {} is {width}x{height} but the decorated area needs {needed_x}x{needed_z}",
        path.display()
    )]
    TooSmall {
        path: PathBuf,
        width: u32,
        height: u32,
        needed_x: usize,
        needed_z: usize,
    },
}
