pub mod biome;
pub mod block;
pub mod column;
pub mod coords;
pub mod heightmap;
pub mod version;
pub mod world;
