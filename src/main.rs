use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scienceqa_indexer::config::{IngestConfig, StoreBackend, StoreConfig};
use scienceqa_indexer::rag::embeddings::EmbeddingGenerator;
use scienceqa_indexer::rag::vector_store::{local, open_store, MemoryStore, VectorStore};
use scienceqa_indexer::{IngestError, IngestReport, Ingestor};

#[derive(Parser, Debug)]
#[command(name = "scienceqa-indexer")]
#[command(about = "Embed the ScienceQA problems into a vector store collection")]
struct Args {
    /// TOML config file (defaults to ./scienceqa.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to problems.json
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Directory of the local vector store
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Vector store backend: local, qdrant or memory
    #[arg(long)]
    backend: Option<StoreBackend>,

    /// Qdrant server URL
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Collection name
    #[arg(long)]
    collection: Option<String>,

    /// Embedding model name
    #[arg(long)]
    model: Option<String>,

    /// Documents per embedding call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Only ingest the first N records
    #[arg(long)]
    limit: Option<usize>,

    /// Load and synthesize documents without writing to the store
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(self, config: &mut IngestConfig) {
        if let Some(dataset) = self.dataset {
            config.dataset_path = dataset;
        }
        if let Some(path) = self.store_path {
            config.store.path = path;
        }
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if let Some(url) = self.qdrant_url {
            config.store.qdrant_url = url;
        }
        if let Some(collection) = self.collection {
            config.collection = collection;
        }
        if let Some(model) = self.model {
            config.embedding.model = model;
        }
        if let Some(batch_size) = self.batch_size {
            config.embedding.batch_size = batch_size;
        }
        if self.no_progress {
            config.embedding.show_progress = false;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = IngestConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    println!("Initializing embedding model {}...", config.embedding.model);
    let embedder = EmbeddingGenerator::new(&config.embedding)
        .context("failed to initialize embedding model")?;

    if !config.dataset_path.exists() {
        return Err(IngestError::DatasetNotFound(config.dataset_path.clone()).into());
    }

    let store: Box<dyn VectorStore> = if config.dry_run && !store_exists(&config.store) {
        println!("Dry run against a store that does not exist yet, nothing will be created");
        Box::new(MemoryStore::new())
    } else {
        match config.store.backend {
            StoreBackend::Local => {
                println!("Opening local store at {}...", config.store.path.display())
            }
            StoreBackend::Qdrant => {
                println!("Connecting to Qdrant at {}...", config.store.qdrant_url)
            }
            StoreBackend::Memory => println!("Using in-memory store (nothing will persist)"),
        }
        open_store(&config.store)
            .await
            .context("failed to open vector store")?
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current batch");
            signal_token.cancel();
        }
    });

    let dataset_path = config.dataset_path.clone();
    let ingestor = Ingestor::new(config, Box::new(embedder), store);
    let report = ingestor
        .run(&cancel)
        .await
        .with_context(|| format!("ingestion of {} failed", dataset_path.display()))?;

    print_summary(&report);
    tracing::debug!("Report: {}", serde_json::to_string(&report)?);
    Ok(())
}

/// Only the local backend is checked; remote stores create nothing on open.
fn store_exists(store: &StoreConfig) -> bool {
    match store.backend {
        StoreBackend::Local => store.path.join(local::DB_FILE).exists(),
        StoreBackend::Qdrant | StoreBackend::Memory => true,
    }
}

fn print_summary(report: &IngestReport) {
    if report.dry_run {
        println!("\nDry run complete, nothing was written.");
    } else {
        println!("\nIngestion complete!");
    }
    println!("  Records loaded:  {}", report.records_loaded);
    println!("  Upserted:        {}", report.upserted);
    match report.dimension {
        Some(dim) => println!("  Dimension:       {}", dim),
        None => println!("  Dimension:       n/a"),
    }
    println!("  Collection:      {}", report.collection);
    println!("  Entries stored:  {}", report.entries_in_collection);
}
