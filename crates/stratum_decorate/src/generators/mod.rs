pub mod analysis;
pub mod bedrock;
pub mod caves;
pub mod merger;
pub mod natural;
pub mod ores;
pub mod snow;
pub mod splat;
pub mod thaw;
pub mod torches;
pub mod vegetation;
pub mod water;
