use std::sync::OnceLock;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const DEEPSLATE: Self = Self(2);
    pub const BEDROCK: Self = Self(3);
    pub const WATER: Self = Self(4);
    pub const LAVA: Self = Self(5);
    pub const GRASS_BLOCK: Self = Self(6);
    pub const GRASS_BLOCK_SNOWY: Self = Self(7);
    pub const DIRT: Self = Self(8);
    pub const PODZOL: Self = Self(9);
    pub const PODZOL_SNOWY: Self = Self(10);
    pub const MYCELIUM: Self = Self(11);
    pub const MYCELIUM_SNOWY: Self = Self(12);
    pub const GRAVEL: Self = Self(13);
    pub const SAND: Self = Self(14);
    pub const SANDSTONE: Self = Self(15);
    pub const SNOW: Self = Self(16);
    pub const SNOW_BLOCK: Self = Self(17);
    pub const POWDER_SNOW: Self = Self(18);
    pub const ICE: Self = Self(19);
    pub const PACKED_ICE: Self = Self(20);
    pub const BLUE_ICE: Self = Self(21);
    pub const OAK_LOG: Self = Self(22);
    pub const OAK_LEAVES: Self = Self(23);
    pub const TALL_GRASS: Self = Self(24);
    pub const TORCH: Self = Self(25);
    pub const COAL_ORE: Self = Self(26);
    pub const DEEPSLATE_COAL_ORE: Self = Self(27);
    pub const IRON_ORE: Self = Self(28);
    pub const DEEPSLATE_IRON_ORE: Self = Self(29);
    pub const GOLD_ORE: Self = Self(30);
    pub const DEEPSLATE_GOLD_ORE: Self = Self(31);
    pub const DIAMOND_ORE: Self = Self(32);
    pub const DEEPSLATE_DIAMOND_ORE: Self = Self(33);
    pub const REDSTONE_ORE: Self = Self(34);
    pub const DEEPSLATE_REDSTONE_ORE: Self = Self(35);
    pub const LAPIS_ORE: Self = Self(36);
    pub const DEEPSLATE_LAPIS_ORE: Self = Self(37);
    pub const COPPER_ORE: Self = Self(38);
    pub const DEEPSLATE_COPPER_ORE: Self = Self(39);
    pub const EMERALD_ORE: Self = Self(40);
    pub const DEEPSLATE_EMERALD_ORE: Self = Self(41);

    pub fn properties(self) -> &'static BlockProperties {
        registry().get_properties(self)
    }

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }

    pub fn is_liquid(self) -> bool {
        self.properties().flags.contains(BlockFlags::LIQUID)
    }

    pub fn is_water(self) -> bool {
        self == Self::WATER
    }

    pub fn has_flags(self, flags: BlockFlags) -> bool {
        self.properties().flags.contains(flags)
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BlockFlags: u16 {
        const SOLID = 1 << 0;
        const LIQUID = 1 << 1;
        /// Soil-like blocks caves must not expose unless allowed to break the surface.
        const TERRAIN_SURFACE = 1 << 2;
        const PLANT_SUSTAINING = 1 << 3;
        const ORE = 1 << 4;
        const SNOWY = 1 << 5;
        const STONE_FAMILY = 1 << 6;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockProperties {
    pub name: String,
    pub flags: BlockFlags,
    /// For presentation-state variants, the plain block this one decorates.
    #[serde(default)]
    pub base: Option<BlockId>,
}

impl BlockProperties {
    /// Name including the presentation state, e.g. `grass_block[snowy=true]`.
    pub fn state_name(&self) -> String {
        if self.flags.contains(BlockFlags::SNOWY) {
            format!("{}[snowy=true]", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct BlockRegistry {
    properties: Vec<BlockProperties>,
    by_name: FxHashMap<String, BlockId>,
    snowy_variants: FxHashMap<BlockId, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, props: BlockProperties) -> BlockId {
        let key = props.state_name();
        if let Some(existing) = self.by_name.get(key.as_str()) {
            return *existing;
        }

        let next_index = self.properties.len();
        let id = BlockId(
            u16::try_from(next_index).expect("block registry exceeded BlockId capacity (u16::MAX)"),
        );

        if let Some(base) = props.base {
            if props.flags.contains(BlockFlags::SNOWY) {
                self.snowy_variants.insert(base, id);
            }
        }
        self.by_name.insert(key, id);
        self.properties.push(props);
        id
    }

    pub fn get_properties(&self, id: BlockId) -> &BlockProperties {
        self.properties
            .get(usize::from(id.0))
            .unwrap_or_else(|| panic!("unknown block id {}", id.0))
    }

    /// Looks up a block by name. A `minecraft:` namespace is accepted and ignored.
    pub fn get_by_name(&self, name: &str) -> Option<BlockId> {
        let trimmed = name.trim();
        let short = trimmed.strip_prefix("minecraft:").unwrap_or(trimmed);
        self.by_name.get(short).copied()
    }

    pub fn snowy_variant(&self, id: BlockId) -> Option<BlockId> {
        self.snowy_variants.get(&id).copied()
    }

    /// Strips the snowy presentation state, returning the plain block.
    pub fn without_snowy(&self, id: BlockId) -> BlockId {
        let props = self.get_properties(id);
        match props.base {
            Some(base) if props.flags.contains(BlockFlags::SNOWY) => base,
            _ => id,
        }
    }

    /// The deep host-rock form of an ore, if one is registered.
    pub fn deep_variant(&self, id: BlockId) -> Option<BlockId> {
        let props = self.get_properties(id);
        if !props.flags.contains(BlockFlags::ORE) || props.name.starts_with("deepslate_") {
            return None;
        }
        self.get_by_name(&format!("deepslate_{}", props.name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockProperties)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(idx, props)| (BlockId(idx as u16), props))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Process-wide registry of the default block set.
pub fn registry() -> &'static BlockRegistry {
    static REGISTRY: OnceLock<BlockRegistry> = OnceLock::new();
    REGISTRY.get_or_init(register_default_blocks)
}

pub fn register_default_blocks() -> BlockRegistry {
    fn block(name: &str, flags: BlockFlags) -> BlockProperties {
        BlockProperties {
            name: name.to_string(),
            flags,
            base: None,
        }
    }

    fn snowy(name: &str, flags: BlockFlags, base: u16) -> BlockProperties {
        BlockProperties {
            name: name.to_string(),
            flags: flags | BlockFlags::SNOWY,
            base: Some(BlockId(base)),
        }
    }

    let solid = BlockFlags::SOLID;
    let rock = BlockFlags::SOLID | BlockFlags::STONE_FAMILY;
    let soil = BlockFlags::SOLID | BlockFlags::TERRAIN_SURFACE;
    let fertile = soil | BlockFlags::PLANT_SUSTAINING;
    let ore = BlockFlags::SOLID | BlockFlags::ORE;
    let liquid = BlockFlags::LIQUID;
    let plant = BlockFlags::empty();

    let mut registry = BlockRegistry::new();
    let defaults = vec![
        block("air", BlockFlags::empty()),      // 0
        block("stone", rock),                    // 1
        block("deepslate", rock),                // 2
        block("bedrock", solid),                 // 3
        block("water", liquid),                  // 4
        block("lava", liquid),                   // 5
        block("grass_block", fertile),           // 6
        snowy("grass_block", fertile, 6),        // 7
        block("dirt", fertile),                  // 8
        block("podzol", fertile),                // 9
        snowy("podzol", fertile, 9),             // 10
        block("mycelium", soil),                 // 11
        snowy("mycelium", soil, 11),             // 12
        block("gravel", soil),                   // 13
        block("sand", soil),                     // 14
        block("sandstone", soil),                // 15
        block("snow", plant),                    // 16
        block("snow_block", soil),               // 17
        block("powder_snow", plant),             // 18
        block("ice", solid),                     // 19
        block("packed_ice", solid),              // 20
        block("blue_ice", solid),                // 21
        block("oak_log", solid),                 // 22
        block("oak_leaves", solid),              // 23
        block("grass", plant),                   // 24
        block("torch", plant),                   // 25
        block("coal_ore", ore),                  // 26
        block("deepslate_coal_ore", ore),        // 27
        block("iron_ore", ore),                  // 28
        block("deepslate_iron_ore", ore),        // 29
        block("gold_ore", ore),                  // 30
        block("deepslate_gold_ore", ore),        // 31
        block("diamond_ore", ore),               // 32
        block("deepslate_diamond_ore", ore),     // 33
        block("redstone_ore", ore),              // 34
        block("deepslate_redstone_ore", ore),    // 35
        block("lapis_ore", ore),                 // 36
        block("deepslate_lapis_ore", ore),       // 37
        block("copper_ore", ore),                // 38
        block("deepslate_copper_ore", ore),      // 39
        block("emerald_ore", ore),               // 40
        block("deepslate_emerald_ore", ore),     // 41
        block("granite", rock),                  // 42
        block("diorite", rock),                  // 43
        block("andesite", rock),                 // 44
        block("tuff", rock),                     // 45
        block("cobblestone", solid),             // 46
        block("mossy_cobblestone", solid),       // 47
        block("clay", soil),                     // 48
        block("coarse_dirt", fertile),           // 49
        block("red_sand", soil),                 // 50
        block("terracotta", solid),              // 51
        block("moss_block", fertile),            // 52
        block("mud", soil),                      // 53
        block("dandelion", plant),               // 54
        block("poppy", plant),                   // 55
        block("fern", plant),                    // 56
        block("dead_bush", plant),               // 57
        block("cactus", solid),                  // 58
        block("spruce_log", solid),              // 59
        block("spruce_leaves", solid),           // 60
        block("birch_log", solid),               // 61
        block("birch_leaves", solid),            // 62
        block("obsidian", solid),                // 63
    ];

    for (idx, props) in defaults.into_iter().enumerate() {
        let id = registry.register(props);
        debug_assert_eq!(id.0 as usize, idx, "default block IDs must be stable");
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::{register_default_blocks, registry, BlockFlags, BlockId};

    #[test]
    fn registry_returns_known_block_properties() {
        let registry = register_default_blocks();

        let air = registry.get_properties(BlockId::AIR);
        assert_eq!(air.name, "air");
        assert!(air.flags.is_empty());

        assert_eq!(registry.get_by_name("stone"), Some(BlockId::STONE));
        assert_eq!(registry.get_by_name("minecraft:deepslate"), Some(BlockId::DEEPSLATE));
        assert_eq!(registry.get_by_name("water"), Some(BlockId::WATER));
        assert_eq!(registry.get_by_name("torch"), Some(BlockId::TORCH));
        assert_eq!(registry.get_by_name("no_such_block"), None);
        assert_eq!(registry.len(), 64);
    }

    #[test]
    fn snowy_variants_link_back_to_their_base() {
        let registry = register_default_blocks();

        assert_eq!(
            registry.snowy_variant(BlockId::GRASS_BLOCK),
            Some(BlockId::GRASS_BLOCK_SNOWY)
        );
        assert_eq!(
            registry.get_by_name("grass_block[snowy=true]"),
            Some(BlockId::GRASS_BLOCK_SNOWY)
        );
        assert_eq!(
            registry.without_snowy(BlockId::PODZOL_SNOWY),
            BlockId::PODZOL
        );
        assert_eq!(registry.without_snowy(BlockId::STONE), BlockId::STONE);
        assert_eq!(registry.snowy_variant(BlockId::STONE), None);
    }

    #[test]
    fn ores_resolve_their_deep_variant() {
        let registry = register_default_blocks();

        assert_eq!(
            registry.deep_variant(BlockId::IRON_ORE),
            Some(BlockId::DEEPSLATE_IRON_ORE)
        );
        assert_eq!(registry.deep_variant(BlockId::DEEPSLATE_IRON_ORE), None);
        assert_eq!(registry.deep_variant(BlockId::STONE), None);
    }

    #[test]
    fn flag_helpers_match_default_blocks() {
        assert!(BlockId::WATER.is_liquid());
        assert!(BlockId::LAVA.is_liquid());
        assert!(!BlockId::STONE.is_liquid());
        assert!(BlockId::GRASS_BLOCK.has_flags(BlockFlags::PLANT_SUSTAINING));
        assert!(BlockId::DIRT.has_flags(BlockFlags::TERRAIN_SURFACE));
        assert!(BlockId::COAL_ORE.has_flags(BlockFlags::ORE));
        assert!(BlockId::AIR.is_air());
        assert_eq!(registry().get_properties(BlockId::TALL_GRASS).name, "grass");
    }
}
