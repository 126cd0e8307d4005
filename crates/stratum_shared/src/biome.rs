use serde::{Deserialize, Serialize};

macro_rules! biomes {
    ($($variant:ident = $id:literal => $name:literal,)*) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum BiomeId {
            $($variant = $id,)*
        }

        impl BiomeId {
            pub const ALL: &'static [BiomeId] = &[$(BiomeId::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(BiomeId::$variant => $name,)*
                }
            }

            pub fn from_u8(id: u8) -> Option<Self> {
                match id {
                    $($id => Some(BiomeId::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

biomes! {
    Ocean = 0 => "ocean",
    Plains = 1 => "plains",
    Desert = 2 => "desert",
    Mountains = 3 => "mountains",
    Forest = 4 => "forest",
    Taiga = 5 => "taiga",
    Swamp = 6 => "swamp",
    River = 7 => "river",
    FrozenOcean = 10 => "frozen_ocean",
    FrozenRiver = 11 => "frozen_river",
    SnowyTundra = 12 => "snowy_tundra",
    SnowyMountains = 13 => "snowy_mountains",
    MushroomFields = 14 => "mushroom_fields",
    Beach = 16 => "beach",
    TaigaHills = 19 => "taiga_hills",
    MountainEdge = 20 => "mountain_edge",
    Jungle = 21 => "jungle",
    DeepOcean = 24 => "deep_ocean",
    StoneShore = 25 => "stone_shore",
    SnowyBeach = 26 => "snowy_beach",
    BirchForest = 27 => "birch_forest",
    DarkForest = 29 => "dark_forest",
    SnowyTaiga = 30 => "snowy_taiga",
    SnowyTaigaHills = 31 => "snowy_taiga_hills",
    GiantTreeTaiga = 32 => "giant_tree_taiga",
    GiantTreeTaigaHills = 33 => "giant_tree_taiga_hills",
    WoodedMountains = 34 => "wooded_mountains",
    Savanna = 35 => "savanna",
    Badlands = 37 => "badlands",
    DeepFrozenOcean = 50 => "deep_frozen_ocean",
    TheVoid = 127 => "the_void",
    GravellyMountains = 131 => "gravelly_mountains",
    TaigaMountains = 133 => "taiga_mountains",
    IceSpikes = 140 => "ice_spikes",
    SnowyTaigaMountains = 158 => "snowy_taiga_mountains",
    GiantSpruceTaiga = 160 => "giant_spruce_taiga",
    GiantSpruceTaigaHills = 161 => "giant_spruce_taiga_hills",
    ModifiedGravellyMountains = 162 => "modified_gravelly_mountains",
}

impl BiomeId {
    /// Parses a biome either by its snake-case name or by its numeric id.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let short = trimmed.strip_prefix("minecraft:").unwrap_or(trimmed);
        if short.starts_with(|c: char| c.is_ascii_digit()) {
            return short.parse::<u8>().ok().and_then(Self::from_u8);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|biome| biome.name().eq_ignore_ascii_case(short))
    }
}

impl Default for BiomeId {
    fn default() -> Self {
        BiomeId::Plains
    }
}

#[cfg(test)]
mod tests {
    use super::BiomeId;

    #[test]
    fn parses_names_and_numeric_ids() {
        assert_eq!(BiomeId::parse("snowy_taiga"), Some(BiomeId::SnowyTaiga));
        assert_eq!(BiomeId::parse("minecraft:plains"), Some(BiomeId::Plains));
        assert_eq!(BiomeId::parse("12"), Some(BiomeId::SnowyTundra));
        assert_eq!(BiomeId::parse("200"), None);
        assert_eq!(BiomeId::parse("not_a_biome"), None);
    }

    #[test]
    fn numeric_ids_round_trip() {
        for &biome in BiomeId::ALL {
            assert_eq!(BiomeId::from_u8(biome as u8), Some(biome));
        }
    }
}
