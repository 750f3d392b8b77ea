//! Hollow sphere DAG builder
//!
//! Builds a thick spherical shell, deduplicates it and reports how far the
//! serialized buffer shrank.
//!
//! Usage:
//!     build_sphere [OPTIONS]
//!
//! Options:
//!     --height <N>            Octree height, 2^N voxels per axis (default: 6)
//!     --policy <POLICY>       Interior material: empty or average (default: empty)
//!     --config <PATH>         Load settings from a JSON file (flags override it)
//!     --no-solidify           Keep uniform subtrees instead of collapsing them
//!     -h, --help              Show this help message

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use svodag::core::logging;
use svodag::voxel::svo::sphere_shell;
use svodag::{DagConfig, InteriorMaterial, VoxelDag};

fn print_help() {
    eprintln!("build_sphere - Hollow sphere DAG builder");
    eprintln!();
    eprintln!("Usage: build_sphere [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    --height <N>            Octree height, 2^N voxels per axis (default: 6)");
    eprintln!("    --policy <POLICY>       Interior material: empty or average (default: empty)");
    eprintln!("    --config <PATH>         Load settings from a JSON file (flags override it)");
    eprintln!("    --no-solidify           Keep uniform subtrees instead of collapsing them");
    eprintln!("    -h, --help              Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    build_sphere --height 8 --policy average");
}

#[derive(Debug, Default)]
struct Args {
    height: Option<usize>,
    policy: Option<InteriorMaterial>,
    config: Option<PathBuf>,
    no_solidify: bool,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--height" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --height".to_string());
                }
                let height = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid height: {}", args[i]))?;
                parsed.height = Some(height);
            }
            "--policy" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --policy".to_string());
                }
                parsed.policy = Some(match args[i].to_lowercase().as_str() {
                    "empty" => InteriorMaterial::Empty,
                    "average" => InteriorMaterial::Average,
                    other => {
                        return Err(format!(
                            "Unknown policy: {}. Valid policies: empty, average",
                            other
                        ));
                    }
                });
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                parsed.config = Some(PathBuf::from(&args[i]));
            }
            "--no-solidify" => parsed.no_solidify = true,
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(parsed)
}

fn resolve_config(args: &Args) -> svodag::Result<DagConfig> {
    let mut config = match &args.config {
        Some(path) => DagConfig::load(path)?,
        None => DagConfig::with_height(6),
    };
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(policy) = args.policy {
        config.interior_material = policy;
    }
    if args.no_solidify {
        config.solidify = false;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut dag = match VoxelDag::with_config(&config) {
        Ok(dag) => dag,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Shell between half and full radius, radius = half the grid
    let half = (dag.extent() / 2) as u64;
    let shell = sphere_shell(config.height, half * half / 2, half * half + 1);
    log::info!("Inserting {} shell voxels into a {}^3 grid", shell.len(), dag.extent());

    let start = Instant::now();
    for p in &shell {
        dag.insert_bits(p.x, p.y, p.z, 1);
    }
    let before = dag.stats();
    log::info!(
        "Built tree in {:.2?}: {} unique nodes, {} serialized bytes",
        start.elapsed(),
        before.unique_nodes,
        before.serialized_bytes,
    );

    let start = Instant::now();
    let dedup = dag.dedup();
    log::info!("Deduplicated in {:.2?} ({:.1}x)", start.elapsed(), dedup.compression_ratio());

    let start = Instant::now();
    let data = dag.serialize();
    log::info!(
        "Serialized {} nodes in {:.2?} ({} bytes, plain octree would need {} nodes)",
        data.len() - 1,
        start.elapsed(),
        svodag::voxel::svo::serialize::as_bytes(&data).len(),
        dag.tree_node_count(),
    );
}
