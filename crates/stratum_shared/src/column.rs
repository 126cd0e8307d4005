use serde::{Deserialize, Serialize};

use crate::biome::BiomeId;
use crate::block::BlockId;

/// One vertical stack of blocks plus the biome of that column.
///
/// Index 0 is the world floor; the owning world knows which Y that is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub blocks: Vec<BlockId>,
    pub biome: BiomeId,
}

impl Column {
    pub fn new_empty(height: usize, biome: BiomeId) -> Self {
        Self {
            blocks: vec![BlockId::AIR; height],
            biome,
        }
    }

    pub fn height(&self) -> usize {
        self.blocks.len()
    }

    pub fn get(&self, index: usize) -> Option<BlockId> {
        self.blocks.get(index).copied()
    }

    pub fn set(&mut self, index: usize, block: BlockId) -> bool {
        match self.blocks.get_mut(index) {
            Some(slot) => {
                *slot = block;
                true
            }
            None => false,
        }
    }

    /// Index of the highest block accepted by `filter`, scanning from the top.
    pub fn highest_matching(&self, filter: impl Fn(BlockId) -> bool) -> Option<usize> {
        self.blocks.iter().rposition(|&block| filter(block))
    }
}
