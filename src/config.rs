use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File};
use serde::Deserialize;

const ENV_PREFIX: &str = "SCIENCEQA";
const DEFAULT_CONFIG_FILE: &str = "scienceqa";

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    pub dataset_path: PathBuf,
    pub collection: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Local,
    Qdrant,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown store backend '{}': expected local, qdrant or memory",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding the local database.
    pub path: PathBuf,
    pub qdrant_url: String,
    pub vector_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Directory with an exported ONNX model (`model.onnx` plus tokenizer
    /// files). Takes precedence over `model`.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    pub batch_size: usize,
    pub show_progress: bool,
}

/// Where the dataset comes from when it is not on disk yet.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub repo_url: String,
    pub data_dir: PathBuf,
    pub git_bin: String,
}

impl IngestConfig {
    /// Layers defaults, the config file, and `SCIENCEQA__*` environment
    /// variables. Without an explicit file, `scienceqa.toml` in the working
    /// directory is used when present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, env_source())
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: IngestConfig = config::Config::builder()
            .set_default("dataset_path", "data/ScienceQA/data/scienceqa/problems.json")?
            .set_default("collection", "scienceqa")?
            .set_default("dry_run", false)?
            .set_default("store.backend", "local")?
            .set_default("store.path", "data/vector_db")?
            .set_default("store.qdrant_url", "http://localhost:6334")?
            .set_default("store.vector_size", 384_i64)?
            .set_default("embedding.model", "all-MiniLM-L6-v2")?
            .set_default("embedding.batch_size", 64_i64)?
            .set_default("embedding.show_progress", true)?
            .set_default("source.repo_url", "https://github.com/lupantech/ScienceQA.git")?
            .set_default("source.data_dir", "data/ScienceQA")?
            .set_default("source.git_bin", "git")?
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Message("collection must not be empty".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Message(
                "embedding.batch_size must be > 0".into(),
            ));
        }
        if self.store.vector_size == 0 {
            return Err(ConfigError::Message("store.vector_size must be > 0".into()));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}
