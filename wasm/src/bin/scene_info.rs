//! Scene Info
//!
//! Parses a `.ply` or `.splat` file and prints its properties: format, size,
//! point count, which channels are present and the bounding box.

use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::Parser;
use scene_ingest::options::{DEFAULT_BOUNDS_BATCH, DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_SCAN_LIMIT};
use scene_ingest::upload::DEFAULT_MAX_FILE_SIZE;
use scene_ingest::{load_scene_file, Checkpoint, ParseOptions, UploadLimits};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "scene-info")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Bytes decoded per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Points folded into the bounds per batch
    #[arg(long, default_value_t = DEFAULT_BOUNDS_BATCH)]
    bounds_batch: usize,

    /// How many bytes to search for the end of a PLY header
    #[arg(long, default_value_t = DEFAULT_HEADER_SCAN_LIMIT)]
    header_scan_limit: usize,

    /// Reject files larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    let opts = ParseOptions::default()
        .with_chunk_size(args.chunk_size)
        .with_bounds_batch(args.bounds_batch)
        .with_header_scan_limit(args.header_scan_limit);
    let limits = UploadLimits {
        max_file_size: args.max_file_size,
    };

    let mut failed = false;
    for path in &args.files {
        let mut on_checkpoint = |c: &Checkpoint| {
            debug!(stage = ?c.stage, processed = c.processed, total = c.total, "progress");
            ControlFlow::Continue(())
        };
        match load_scene_file(path, &limits, &opts, &mut on_checkpoint) {
            Ok(ds) => println!("{ds}\n"),
            Err(e) => {
                error!(path = %path.display(), "{e}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
