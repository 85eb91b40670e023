use fastembed::{
    EmbeddingModel, InitOptions, InitOptionsUserDefined, TextEmbedding, TokenizerFiles,
    UserDefinedEmbeddingModel,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::config::EmbeddingConfig;
use crate::error::{IngestError, Result};

/// Turns a batch of texts into vectors, one per text, in input order.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

pub struct EmbeddingGenerator {
    model: TextEmbedding,
    model_name: String,
}

impl EmbeddingGenerator {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        match &config.model_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::from_name(config),
        }
    }

    fn from_name(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing embedding model {}...", config.model);

        let mut options = InitOptions {
            model_name: resolve_model(&config.model)?,
            show_download_progress: config.show_progress,
            ..Default::default()
        };
        if let Some(cache_dir) = &config.cache_dir {
            options.cache_dir = cache_dir.clone();
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            IngestError::Embedding(format!("failed to initialize {}: {}", config.model, e))
        })?;

        tracing::info!("Embedding model initialized successfully");
        Ok(Self {
            model,
            model_name: config.model.clone(),
        })
    }

    fn from_dir(model_dir: &Path) -> Result<Self> {
        tracing::info!(
            "Initializing embedding model from local files in {}...",
            model_dir.display()
        );

        if !model_dir.exists() {
            return Err(IngestError::Embedding(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }

        let read = |name: &str| {
            let path = model_dir.join(name);
            std::fs::read(&path).map_err(|source| IngestError::Io { path, source })
        };

        let onnx_file = read("model.onnx")?;
        let tokenizer_file = read("tokenizer.json")?;
        let config_file = read("config.json")?;
        let special_tokens_map_file = read("special_tokens_map.json")?;
        let tokenizer_config_file = read("tokenizer_config.json")?;

        tracing::info!("Model files loaded, creating embedding model...");

        let user_model = UserDefinedEmbeddingModel {
            onnx_file,
            tokenizer_files: TokenizerFiles {
                tokenizer_file,
                config_file,
                special_tokens_map_file,
                tokenizer_config_file,
            },
        };

        let model = TextEmbedding::try_new_from_user_defined(
            user_model,
            InitOptionsUserDefined::default(),
        )
        .map_err(|e| IngestError::Embedding(format!("failed to initialize model: {}", e)))?;

        tracing::info!("Embedding model initialized successfully");
        Ok(Self {
            model,
            model_name: model_dir.display().to_string(),
        })
    }
}

impl Embedder for EmbeddingGenerator {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts, None)
            .map_err(|e| IngestError::Embedding(e.to_string()))
    }
}

/// Maps a sentence-transformers style model name onto a fastembed model.
/// Matching ignores case and an optional organisation prefix.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        _ => Err(IngestError::Embedding(format!(
            "unknown embedding model '{}'",
            name
        ))),
    }
}

/// Embeds `documents` in sub-batches of `batch_size`.
///
/// The output has exactly one vector per document, in order, and every
/// vector has the dimension of the first one. Cancellation is checked
/// before each sub-batch.
pub fn embed_batch(
    embedder: &dyn Embedder,
    documents: &[String],
    batch_size: usize,
    show_progress: bool,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let pb = if show_progress {
        let pb = ProgressBar::new(documents.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("embedding");
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(documents.len());
    let mut dimension: Option<usize> = None;

    for batch in documents.chunks(batch_size) {
        if cancel.is_cancelled() {
            pb.abandon_with_message("cancelled");
            return Err(IngestError::Cancelled);
        }

        let batch_vectors = embedder.embed(batch.to_vec())?;
        if batch_vectors.len() != batch.len() {
            return Err(IngestError::EmbeddingCount {
                expected: batch.len(),
                actual: batch_vectors.len(),
            });
        }

        for vector in &batch_vectors {
            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(IngestError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        tracing::debug!(
            "Embedded {} documents ({} done)",
            batch.len(),
            vectors.len() + batch.len()
        );
        vectors.extend(batch_vectors);
        pb.inc(batch.len() as u64);
    }

    pb.finish_with_message("done");
    Ok(vectors)
}
