use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use stratum_persist::region::RegionFile;
use stratum_shared::block::BlockId;

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: region_inspector <path/to/region-file>");
        std::process::exit(2);
    };

    if let Err(err) = run(Path::new(&path)) {
        eprintln!("region_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), String> {
    let region = RegionFile::open(path)
        .map_err(|err| format!("failed to open {}: {err}", path.display()))?;

    let pos = region.region();
    let (min_y, max_y) = region.limits();
    println!("Region: {} @ ({}, {})", path.display(), pos.x, pos.z);
    println!("Build limits: {min_y}..={max_y}");
    println!("Columns: {}", region.column_count());
    println!("Pending ticks: {}", region.ticks().len());

    let mut counts: BTreeMap<BlockId, u64> = BTreeMap::new();
    for (_, column) in region.columns() {
        for block in (0..column.height()).filter_map(|i| column.get(i)) {
            *counts.entry(block).or_default() += 1;
        }
    }

    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (block, count) in sorted {
        println!("  {:<28} {count}", block.properties().state_name());
    }

    Ok(())
}
