//! Folio bulk indexer
//!
//! Walks a directory of Markdown book pages and indexes every page:
//! 1. Discovers `*.md` / `*.mdx` files
//! 2. Derives doc id, title and section from each page
//! 3. Chunks, embeds and stores it through the shared RAG service

mod errors;
mod markdown;
mod processor;

use anyhow::Context;
use clap::Parser;
use folio_common::config::ObservabilityConfig;
use folio_common::{metrics, AppConfig, RagService, VERSION};
use processor::BookIndexer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ingestion")]
#[command(about = "Index a directory of Markdown book pages into Folio")]
#[command(version)]
struct Args {
    /// Root of the book's docs tree
    docs_dir: PathBuf,

    /// Configuration file to load instead of the layered config/ directory
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(version = VERSION, docs_dir = %args.docs_dir.display(), "Starting Folio ingestion");

    config.validate()?;
    metrics::register_metrics();

    let rag = RagService::connect(&config)
        .await
        .context("Failed to initialise RAG service")?;
    let indexer = BookIndexer::new(Arc::new(rag))?;

    let report = indexer.index_directory(&args.docs_dir).await?;
    if report.failed > 0 {
        warn!(failed = report.failed, "Some pages could not be indexed");
    }

    info!(
        discovered = report.discovered,
        indexed = report.indexed,
        failed = report.failed,
        chunks = report.chunks,
        "Ingestion complete"
    );
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
