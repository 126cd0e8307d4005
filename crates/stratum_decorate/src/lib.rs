//! Procedural decoration of heightmap-derived voxel worlds.
//!
//! A [`Chain`] is built from a TOML document, orders its generators by priority and sweeps
//! them over a [`VoxelWorld`](stratum_shared::world::VoxelWorld) that
//! [`build_base_terrain`] filled beforehand.

pub mod base_terrain;
pub mod chain;
pub mod config;
pub mod error;
pub mod generator;
pub mod generators;
pub mod layer;
pub mod registry;
pub mod structure;
pub mod weightmap;

pub use base_terrain::build_base_terrain;
pub use chain::{Chain, ChainSource};
pub use config::{BuildContext, ExportSettings, DEFAULT_CHAIN};
pub use error::{ConfigError, WeightmapError};
pub use generator::{Generator, GeneratorKind, Mask, Priority, ProcessMode};
pub use registry::GeneratorRegistry;
pub use structure::Structure;
pub use weightmap::{Channel, LayerChannel, RgbaWeightmap, SplatMap, Weightmap};
