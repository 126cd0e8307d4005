use std::path::Path;

use glam::IVec3;
use image::{Rgba, RgbaImage};
use stratum_decorate::{build_base_terrain, Chain, ChainSource, ExportSettings};
use stratum_shared::biome::BiomeId;
use stratum_shared::block::BlockId;
use stratum_shared::coords::Boundary;
use stratum_shared::heightmap::Heightmap;
use stratum_shared::version::GameVersion;
use stratum_shared::world::{MemoryWorld, VoxelWorld, WorldView};

fn terrain(bounds: Boundary, heightmap: &Heightmap, settings: &ExportSettings) -> MemoryWorld {
    let mut world = MemoryWorld::new(bounds, settings.version, BiomeId::Plains);
    build_base_terrain(&mut world, heightmap, settings);
    world
}

fn chain_from(text: &str, root: &Path, settings: &ExportSettings, bounds: Boundary) -> Chain {
    Chain::build(ChainSource::Text { text, root }, settings, bounds, false).expect("chain")
}

#[test]
fn default_chain_keeps_the_deep_layering() {
    let bounds = Boundary::from_size(0, 0, 16, 16);
    let heightmap = Heightmap::new_filled(bounds, 64);
    let settings = ExportSettings {
        version: GameVersion::release(18),
        seed: 2024,
        flat_bedrock: true,
        ..ExportSettings::default()
    };
    let mut world = terrain(bounds, &heightmap, &settings);

    for x in 0..16 {
        for z in 0..16 {
            assert_eq!(world.get_block(IVec3::new(x, -64, z)), Some(BlockId::BEDROCK));
            assert_eq!(world.get_block(IVec3::new(x, -1, z)), Some(BlockId::DEEPSLATE));
            assert_eq!(world.get_block(IVec3::new(x, 0, z)), Some(BlockId::STONE));
            assert_eq!(world.get_block(IVec3::new(x, 64, z)), Some(BlockId::STONE));
            assert_eq!(world.get_block(IVec3::new(x, 65, z)), Some(BlockId::AIR));
        }
    }

    let mut chain = Chain::build(ChainSource::Default, &settings, bounds, false).expect("default");
    chain.run(&mut world, &heightmap, bounds);

    for x in 0..16 {
        for z in 0..16 {
            for y in world.min_y()..=world.max_y() {
                let block = world.get_block(IVec3::new(x, y, z)).expect("in volume");
                if y == -64 {
                    assert_eq!(block, BlockId::BEDROCK);
                    continue;
                }
                assert_ne!(block, BlockId::BEDROCK, "stray bedrock at [{x},{y},{z}]");
                if y < 0 {
                    assert_ne!(block, BlockId::STONE, "stone below the transition at y={y}");
                } else {
                    assert_ne!(block, BlockId::DEEPSLATE, "deepslate above the transition at y={y}");
                }
                if y > 64 {
                    assert_ne!(block, BlockId::STONE);
                }
            }
        }
    }
}

#[test]
fn certain_ore_rule_fills_its_only_cell() {
    let bounds = Boundary::from_size(0, 0, 1, 1);
    let heightmap = Heightmap::new_filled(bounds, 40);
    let settings = ExportSettings {
        version: GameVersion::release(16),
        flat_bedrock: true,
        ..ExportSettings::default()
    };
    let mut world = terrain(bounds, &heightmap, &settings);
    assert_eq!(world.get_block(IVec3::new(0, 10, 0)), Some(BlockId::STONE));

    let mut chain = chain_from(
        r#"
[[generator]]
kind = "ores"

[[generator.layer]]
[[generator.layer.ores]]
block = "gold_ore"
size = 1
rarity = 256
y-min = 10
y-max = 10
"#,
        Path::new("."),
        &settings,
        bounds,
    );
    chain.run(&mut world, &heightmap, bounds);

    assert_eq!(world.get_block(IVec3::new(0, 10, 0)), Some(BlockId::GOLD_ORE));
    for y in (1..40).filter(|&y| y != 10) {
        assert_eq!(world.get_block(IVec3::new(0, y, 0)), Some(BlockId::STONE));
    }
}

#[test]
fn deice_restores_biome_and_clears_snowy_blocks() {
    let bounds = Boundary::from_size(5, 5, 1, 1);
    let heightmap = Heightmap::new_filled(bounds, 20);
    let settings = ExportSettings {
        version: GameVersion::release(16),
        ..ExportSettings::default()
    };
    let mut world = terrain(bounds, &heightmap, &settings);
    world.set_biome(5, 5, BiomeId::SnowyTaiga);
    world.set_block(IVec3::new(5, 20, 5), BlockId::GRASS_BLOCK_SNOWY);
    world.set_block(IVec3::new(5, 21, 5), BlockId::SNOW);

    let mut chain = chain_from("[[generator]]\nkind = \"deice\"\n", Path::new("."), &settings, bounds);
    chain.run(&mut world, &heightmap, bounds);

    assert_eq!(world.get_biome(5, 5), Some(BiomeId::Taiga));
    assert_eq!(world.get_block(IVec3::new(5, 20, 5)), Some(BlockId::GRASS_BLOCK));
    assert_eq!(world.get_block(IVec3::new(5, 21, 5)), Some(BlockId::AIR));
}

#[test]
fn same_seed_and_config_give_identical_worlds() {
    let bounds = Boundary::from_size(-8, 3, 24, 20);
    let heightmap = Heightmap::from_fn(bounds, |x, z| 50 + (x * 3 + z * 5).rem_euclid(17));
    let settings = ExportSettings {
        version: GameVersion::release(18),
        seed: 77,
        ..ExportSettings::default()
    };
    let config = "[[generator]]\nkind = \"bedrock\"\n\n[[generator]]\nkind = \"caves\"\n\n\
                  [[generator]]\nkind = \"ores\"\n\n[[generator]]\nkind = \"naturalize\"\n\n\
                  [[generator]]\nkind = \"vegetation\"\ntrees = 4.0\n\n\
                  [[generator]]\nkind = \"torches\"\namount = 0.1\n";

    let run = || {
        let mut world = terrain(bounds, &heightmap, &settings);
        let mut chain = chain_from(config, Path::new("."), &settings, bounds);
        chain.run(&mut world, &heightmap, bounds);
        world
    };
    let first = run();
    let second = run();
    assert_eq!(first.columns(), second.columns());
    assert_eq!(first.pending_ticks(), second.pending_ticks());
}

#[test]
fn zero_mask_columns_are_never_touched() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut mask = RgbaImage::new(4, 4);
    for (x, _, pixel) in mask.enumerate_pixels_mut() {
        *pixel = if x < 2 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        };
    }
    mask.save(dir.path().join("mask.png")).expect("write mask");

    let bounds = Boundary::from_size(100, -50, 4, 4);
    let heightmap = Heightmap::new_filled(bounds, 30);
    let settings = ExportSettings {
        version: GameVersion::release(16),
        seed: 9,
        ..ExportSettings::default()
    };
    let mut world = terrain(bounds, &heightmap, &settings);
    let before = world.clone();

    let mut chain = chain_from(
        r#"
[[generator]]
kind = "snow"
check-biomes = false
passes = 2
[generator.mask]
file = "mask.png"

[[generator]]
kind = "torches"
amount = 1.0
[generator.mask]
file = "mask.png"
"#,
        dir.path(),
        &settings,
        bounds,
    );
    assert_eq!(chain.len(), 2);
    chain.run(&mut world, &heightmap, bounds);

    for x in 100..102 {
        for z in -50..-46 {
            assert_eq!(world.column(x, z), before.column(x, z));
        }
    }
    for z in -50..-46 {
        assert_eq!(world.get_block(IVec3::new(103, 31, z)), Some(BlockId::SNOW));
    }
}

#[test]
fn analysis_report_lands_in_the_world_folder() {
    let bounds = Boundary::from_size(0, 0, 8, 8);
    let heightmap = Heightmap::new_filled(bounds, 12);
    let settings = ExportSettings {
        version: GameVersion::release(16),
        analyze_blocks: true,
        ..ExportSettings::default()
    };
    let mut world = terrain(bounds, &heightmap, &settings);
    let mut chain = chain_from("", Path::new("."), &settings, bounds);
    chain.run(&mut world, &heightmap, bounds);

    let dir = tempfile::tempdir().expect("temp dir");
    chain.on_create_world_files(dir.path()).expect("side files");
    let report = std::fs::read_to_string(dir.path().join("analysis.csv")).expect("report");
    let row_13 = report
        .lines()
        .find(|line| line.starts_with("13,"))
        .expect("row for y=13");
    assert!(row_13.split(',').skip(1).any(|count| count == "64"));
}
