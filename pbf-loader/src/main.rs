use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pbf_loader::{read_map, AttributeFilter, LoaderConfig};

/// Load an OSM PBF extract and report what it contains.
#[derive(Parser, Debug)]
#[command(version, about)]
struct ClArgs {
    /// Path to the `.osm.pbf` file
    input: PathBuf,

    /// Decode worker threads (default: one per core, minus one)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Data blobs buffered between the reader and the workers
    #[arg(long, default_value_t = 0)]
    queue_depth: usize,

    /// Only keep these way attribute keys (repeatable)
    #[arg(long = "keep-way-key")]
    keep_way_keys: Vec<String>,

    /// Print the `key=value` census of way attributes
    #[arg(long)]
    histogram: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = ClArgs::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let mut config = match args.workers {
        Some(workers) => LoaderConfig::with_workers(workers),
        None => LoaderConfig::default(),
    };
    config.work_queue_depth = args.queue_depth;
    if !args.keep_way_keys.is_empty() {
        config.filter = AttributeFilter {
            way_keys: Some(args.keep_way_keys.iter().cloned().collect::<HashSet<_>>()),
            ..AttributeFilter::default()
        };
    }

    // Buffering sits below the blob reader; it issues many small reads.
    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("Could not open {}", args.input.display()))?;
    let map = read_map(std::io::BufReader::new(file), &config)
        .with_context(|| format!("Could not load {}", args.input.display()))?;

    info!(
        points = map.store.point_count(),
        ways = map.store.way_count(),
        relations = map.store.relation_count(),
        blobs = map.stats.data_blobs,
        dropped = map.stats.dropped_blobs,
        "Loaded map"
    );

    if args.histogram {
        let histogram = map.store.attribute_histogram();
        let mut ways: Vec<_> = histogram.ways.into_iter().collect();
        ways.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (pair, count) in ways {
            println!("WAY ATTR {} ({})", pair, count);
        }
    }
    Ok(())
}
