//! CLI for clipscape: diverse nearest-neighbour image retrieval.
//!
//! Subcommands:
//!  - `search`   : best match plus cluster representatives for a text, image or vector query.
//!  - `navigate` : step a vector through embedding space and search around the new point.
//!  - `record`   : metadata for one vector id.
//!  - `info`     : summary of the loaded index/metadata snapshot.
//!
//! Every subcommand loads an index snapshot (`--index`, JSON written by
//! `clipscape::save_index_json`) and a SQLite metadata file (`--metadata`)
//! read-only, validates them against each other and runs one query.
//!
//! Usage examples:
//!  cargo run -p clipscape -- search -i index.json -m metadata.db --text "a red bicycle"
//!  cargo run -p clipscape -- navigate -i index.json -m metadata.db --from-id 12 --axis 40 --step-size 0.5
//!
//! Notes:
//!  - Queries are embedded with the deterministic `HashEmbedder`, sized to the
//!    index dimension. Real CLIP embeddings come from whatever process built
//!    the index.
//!  - With `--json`, results are printed as JSON; retrieval errors are printed
//!    as `{"kind": ..., "message": ...}` before exiting non-zero.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use clipscape::retrieval::axis_direction;
use clipscape::utils::logging;
use clipscape::{
    load_index_json, Explorer, HashEmbedder, RetrievalConfig, RetrievalError, RetrievalResult,
    Snapshot, SqliteMetadataStore, VectorId, VectorIndex,
};

/// CLI entrypoint.
#[derive(Parser)]
#[command(
    name = "clipscape",
    about = "clipscape CLI: diverse image search and embedding-space navigation",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search by text, image file or raw vector.
    Search(SearchArgs),

    /// Step from a vector along a direction, then search.
    Navigate(NavigateArgs),

    /// Print the metadata record for a vector id.
    Record(RecordArgs),

    /// Summarise the loaded snapshot.
    Info(InfoArgs),
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Search(a) => a.snapshot.json,
            Commands::Navigate(a) => a.snapshot.json,
            Commands::Record(a) => a.snapshot.json,
            Commands::Info(a) => a.snapshot.json,
        }
    }
}

/// Snapshot and configuration flags shared by every subcommand.
#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Path to the index snapshot JSON.
    #[arg(short = 'i', long, value_name = "PATH")]
    index: PathBuf,

    /// Path to the SQLite metadata database.
    #[arg(short = 'm', long, value_name = "PATH")]
    metadata: PathBuf,

    /// Optional retrieval configuration JSON. Flags below override it.
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Candidates fetched before diversification (default: 100).
    #[arg(long)]
    pool_size: Option<usize>,

    /// Maximum number of cluster representatives (default: 6).
    #[arg(long)]
    clusters: Option<usize>,

    /// k-means seed (default: 42).
    #[arg(long)]
    seed: Option<u64>,

    /// Output as JSON.
    #[arg(long)]
    json: bool,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Text query.
    #[arg(short, long, conflicts_with_all = ["image", "vector_file"])]
    text: Option<String>,

    /// Image file to search with.
    #[arg(long, value_name = "PATH", conflicts_with = "vector_file")]
    image: Option<PathBuf>,

    /// JSON array holding a query vector.
    #[arg(long, value_name = "PATH")]
    vector_file: Option<PathBuf>,
}

/// Arguments for the `navigate` subcommand.
#[derive(Args, Debug)]
struct NavigateArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Start from the stored embedding of this vector id.
    #[arg(long, conflicts_with = "from_file")]
    from_id: Option<u64>,

    /// Start from a vector read from a JSON array file.
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Direction vector (JSON array file).
    #[arg(long, value_name = "PATH", conflicts_with = "axis")]
    direction_file: Option<PathBuf>,

    /// Walk along a single dimension instead of a direction file.
    #[arg(long)]
    axis: Option<usize>,

    /// Walk down the axis instead of up.
    #[arg(long, requires = "axis")]
    negative: bool,

    /// Step size (default: 1.0).
    #[arg(long)]
    step_size: Option<f32>,
}

/// Arguments for the `record` subcommand.
#[derive(Args, Debug)]
struct RecordArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Zero-based vector id.
    #[arg(long)]
    id: u64,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
}

/// Application entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let json = cli.command.json();
    let outcome = match cli.command {
        Commands::Search(args) => run_search(args),
        Commands::Navigate(args) => run_navigate(args),
        Commands::Record(args) => run_record(args),
        Commands::Info(args) => run_info(args),
    };

    if json {
        if let Err(err) = &outcome {
            if let Some(retrieval_err) = err.downcast_ref::<RetrievalError>() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&retrieval_err.to_response())?
                );
            }
        }
    }
    outcome
}

/// Load configuration, index and metadata, and build the explorer.
fn open_explorer(args: &SnapshotArgs) -> Result<Explorer> {
    let start = Instant::now();
    let index = load_index_json(&args.index)
        .with_context(|| format!("loading index from {}", args.index.display()))?;

    let mut config = match &args.config {
        Some(path) => RetrievalConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        // Without a config file the index decides which space we search in.
        None => RetrievalConfig {
            metric: index.metric(),
            ..RetrievalConfig::default()
        },
    };
    if let Some(pool_size) = args.pool_size {
        config.pool_size = pool_size;
    }
    if let Some(clusters) = args.clusters {
        config.cluster_count = clusters;
    }
    if let Some(seed) = args.seed {
        config.clustering.seed = seed;
    }

    let store = SqliteMetadataStore::open(&args.metadata)
        .with_context(|| format!("opening metadata store {}", args.metadata.display()))?;
    let provider = Arc::new(HashEmbedder::new(index.dimension()));
    let explorer = Explorer::new(
        provider,
        Snapshot::new(Arc::new(index), Arc::new(store)),
        config,
    )
    .context("validating index and metadata snapshot")?;
    info!(elapsed = ?start.elapsed(), "snapshot loaded");
    Ok(explorer)
}

/// Run the `search` subcommand.
fn run_search(args: SearchArgs) -> Result<()> {
    let explorer = open_explorer(&args.snapshot)?;
    let result = if let Some(text) = args.text.as_deref() {
        explorer.search_by_text(text).context("text search")?
    } else if let Some(path) = args.image.as_ref() {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
        explorer.search_by_image(&bytes).context("image search")?
    } else if let Some(path) = args.vector_file.as_ref() {
        let query = read_vector(path)?;
        explorer.search_by_vector(&query).context("vector search")?
    } else {
        anyhow::bail!("one of --text, --image or --vector-file is required");
    };
    print_result(&result, args.snapshot.json)
}

/// Run the `navigate` subcommand.
fn run_navigate(args: NavigateArgs) -> Result<()> {
    let explorer = open_explorer(&args.snapshot)?;
    let snapshot = explorer.snapshot();
    let dimension = snapshot.index.dimension();

    let current = match (args.from_id, args.from_file.as_ref()) {
        (Some(id), _) => snapshot
            .index
            .reconstruct(VectorId(id))
            .with_context(|| format!("reading stored embedding {}", id))?,
        (None, Some(path)) => read_vector(path)?,
        (None, None) => anyhow::bail!("one of --from-id or --from-file is required"),
    };

    let direction = match (args.direction_file.as_ref(), args.axis) {
        (Some(path), _) => read_vector(path)?,
        (None, Some(axis)) => {
            let sign = if args.negative { -1 } else { 1 };
            axis_direction(dimension, axis, sign).context("building axis direction")?
        }
        (None, None) => anyhow::bail!("one of --direction-file or --axis is required"),
    };

    let result = explorer
        .navigate(&current, &direction, args.step_size)
        .context("navigating")?;
    print_result(&result, args.snapshot.json)
}

/// Run the `record` subcommand.
fn run_record(args: RecordArgs) -> Result<()> {
    let explorer = open_explorer(&args.snapshot)?;
    let record = explorer
        .record(VectorId(args.id))
        .with_context(|| format!("looking up vector {}", args.id))?;
    if args.snapshot.json {
        let out = json!({ "index": args.id, "metadata": record });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("index={}", args.id);
        println!("id={}", record.id);
        println!("url={}", record.url);
        if let Some(desc) = record.description.as_deref() {
            println!("desc: {}", desc);
        }
    }
    Ok(())
}

/// Run the `info` subcommand.
fn run_info(args: InfoArgs) -> Result<()> {
    let explorer = open_explorer(&args.snapshot)?;
    let info = explorer.info();
    if args.snapshot.json {
        let out = json!({ "snapshot": info, "config": explorer.config() });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let cfg = explorer.config();
        println!("vectors={}", info.vectors);
        println!("dimension={}", info.dimension);
        println!("metric={}", info.metric);
        println!("model={}", info.model);
        println!(
            "pool_size={} clusters={} seed={}",
            cfg.pool_size, cfg.cluster_count, cfg.clustering.seed
        );
    }
    Ok(())
}

/// Read a JSON array of floats from `path`.
fn read_vector(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let v: Vec<f32> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing vector from {}", path.display()))?;
    Ok(v)
}

fn print_result(result: &RetrievalResult, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let Some(best) = result.best_match.as_ref() else {
        println!("No results.");
        return Ok(());
    };
    println!(
        "best match: index={} score={:.4} id={} url={}",
        best.id, best.score, best.metadata.id, best.metadata.url
    );
    if result.clusters.is_empty() {
        println!("\nNo cluster representatives.");
    } else {
        println!("\nCluster representatives:");
        for (i, e) in result.clusters.iter().enumerate() {
            let desc = e.metadata.description.as_deref().unwrap_or("");
            let snippet = if desc.chars().count() > 80 {
                format!("{}...", desc.chars().take(80).collect::<String>())
            } else {
                desc.to_string()
            };
            println!(
                "{}. index={} score={:.4} id={} url={} {}",
                i + 1,
                e.id,
                e.score,
                e.metadata.id,
                e.metadata.url,
                snippet
            );
        }
    }
    Ok(())
}
