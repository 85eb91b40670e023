use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("answer index {index} is out of range for {len} choices")]
    AnswerOutOfRange { index: i64, len: usize },

    #[error("invalid record {id}: {source}")]
    InvalidRecord {
        id: String,
        #[source]
        source: Box<IngestError>,
    },

    #[error("embedding model error: {0}")]
    Embedding(String),

    #[error("embedding model returned {actual} vectors for {expected} documents")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "upsert length mismatch: {ids} ids, {documents} documents, {embeddings} embeddings"
    )]
    LengthMismatch {
        ids: usize,
        documents: usize,
        embeddings: usize,
    },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("store directory {} is not usable: {source}", path.display())]
    StoreDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("qdrant error: {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("git clone of {url} failed with {status}")]
    CloneFailed { url: String, status: ExitStatus },

    #[error("ingestion cancelled")]
    Cancelled,
}
