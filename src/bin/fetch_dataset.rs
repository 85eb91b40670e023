use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scienceqa_indexer::config::IngestConfig;
use scienceqa_indexer::indexer::{ensure_dataset, FetchOutcome};

#[derive(Parser, Debug)]
#[command(name = "fetch-dataset")]
#[command(about = "Clone the ScienceQA repository if it is not already present")]
struct Args {
    /// TOML config file (defaults to ./scienceqa.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Git URL of the dataset repository
    #[arg(long)]
    repo_url: Option<String>,

    /// Directory to clone into
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = IngestConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(url) = args.repo_url {
        config.source.repo_url = url;
    }
    if let Some(dir) = args.data_dir {
        config.source.data_dir = dir;
    }

    let outcome = ensure_dataset(&config.source)
        .with_context(|| format!("failed to fetch {}", config.source.repo_url))?;

    match outcome {
        FetchOutcome::AlreadyPresent => println!(
            "Dataset already exists at {}",
            config.source.data_dir.display()
        ),
        FetchOutcome::Cloned => println!(
            "Dataset downloaded to {}",
            config.source.data_dir.display()
        ),
    }
    Ok(())
}
