mod export;

use std::env;
use std::path::PathBuf;

use stratum_shared::version::GameVersion;

use export::ExportConfig;

const USAGE: &str = "Usage: stratum --heightmap <png> [--config <toml>] [--out <dir>] [--seed <u64>] \
[--version <1.x>] [--void] [--no-default] [--analyze] [--flat-bedrock]";

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str, what: &str) -> String {
    match args.next() {
        Some(value) => value,
        None => {
            eprintln!("{flag} expects {what}");
            std::process::exit(2);
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut heightmap = None;
    let mut config = ExportConfig::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--heightmap" => {
                heightmap = Some(PathBuf::from(value_of(&mut args, "--heightmap", "a path argument")));
            }
            "--config" => {
                config.chain = Some(PathBuf::from(value_of(&mut args, "--config", "a path argument")));
            }
            "--out" => {
                config.out = PathBuf::from(value_of(&mut args, "--out", "a path argument"));
            }
            "--seed" => {
                let value = value_of(&mut args, "--seed", "a numeric argument");
                match value.parse::<u64>() {
                    Ok(seed) => config.settings.seed = seed,
                    Err(err) => {
                        eprintln!("invalid seed '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--version" => {
                let value = value_of(&mut args, "--version", "a version like 1.18");
                match value.parse::<GameVersion>() {
                    Ok(version) => config.settings.version = version,
                    Err(err) => {
                        eprintln!("invalid version '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--void" => config.settings.generate_void = true,
            "--no-default" => config.allow_default = false,
            "--analyze" => config.settings.analyze_blocks = true,
            "--flat-bedrock" => config.settings.flat_bedrock = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let Some(heightmap) = heightmap else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    config.heightmap = heightmap;

    if let Err(err) = export::run(&config) {
        eprintln!("export failed: {err}");
        std::process::exit(1);
    }
}
