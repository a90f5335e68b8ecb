//! brickbin command line driver
//!
//! Loads a parts inventory, clusters it, and writes the sorting guide HTML.

use anyhow::{bail, Context, Result};
use brickbin::{Config, Inventory};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(version, about = "Cluster a LEGO parts inventory for physical sorting")]
struct Args {
    /// Catalog set number to resolve via the Rebrickable API
    #[arg(short, long)]
    set: Option<String>,

    /// Part list file (.json, .csv, .bsx, .pbg)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Number of clusters to form
    #[arg(short = 'k', long, default_value = "10")]
    clusters: usize,

    /// Random seed for reproducible clustering (random if omitted)
    #[arg(long)]
    seed: Option<String>,

    /// Output HTML path
    #[arg(short, long, default_value = "clusters.html")]
    output: PathBuf,

    /// Cache database location
    #[arg(short, long, env = "BRICKBIN_DATABASE")]
    database: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brickbin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.set.is_none() && args.file.is_none() {
        bail!(
            "no input given; pass --set or --file (supported extensions: {})",
            Inventory::supported_extensions()
        );
    }

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if args.database.is_some() {
        config.database = args.database.clone();
    }

    let mut inventory = Inventory::new(config);
    inventory
        .load_and_enrich(args.set.as_deref(), args.file.as_deref())
        .await
        .context("Failed to load input")?;

    let seed = inventory
        .cluster(args.clusters, args.seed.as_deref())
        .context("Clustering failed")?;
    info!("Clustered with seed {}", seed);

    let html = inventory.render().await.context("Rendering failed")?;
    std::fs::write(&args.output, html)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Wrote {}", args.output.display());

    Ok(())
}
