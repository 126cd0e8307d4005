pub mod archive;
pub mod level;
pub mod region;
