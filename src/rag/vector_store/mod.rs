//! Vector store backends.
//!
//! Every backend implements [`VectorStore`]: named collections holding
//! `(id, document, embedding)` entries, written with upsert-by-id.

pub mod local;
pub mod memory;
pub mod qdrant;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{IngestError, Result};
use crate::models::Collection;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Fails with [`IngestError::CollectionNotFound`] for unknown names.
    async fn get_collection(&self, name: &str) -> Result<Collection>;

    /// Creating a collection that already exists returns it unchanged.
    async fn create_collection(&self, name: &str) -> Result<Collection>;

    /// Inserts or overwrites entries keyed by id. The three slices are
    /// aligned by position and must have equal lengths.
    async fn upsert(
        &self,
        collection: &Collection,
        ids: &[String],
        documents: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()>;

    async fn count(&self, collection: &Collection) -> Result<u64>;
}

/// Returns the named collection, creating it if no collection of that name
/// exists yet.
pub async fn ensure_collection(store: &dyn VectorStore, name: &str) -> Result<Collection> {
    let existing = store.list_collections().await?;
    if existing.iter().any(|n| n == name) {
        tracing::info!("Using existing collection {}", name);
        store.get_collection(name).await
    } else {
        tracing::info!("Creating collection {}", name);
        store.create_collection(name).await
    }
}

/// Opens the backend selected in `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
    let store: Box<dyn VectorStore> = match config.backend {
        StoreBackend::Local => Box::new(LocalStore::open(&config.path).await?),
        StoreBackend::Qdrant => Box::new(QdrantStore::new(&config.qdrant_url, config.vector_size)?),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    };
    Ok(store)
}

pub(crate) fn check_aligned(
    ids: &[String],
    documents: &[String],
    embeddings: &[Vec<f32>],
) -> Result<()> {
    if ids.len() != documents.len() || ids.len() != embeddings.len() {
        return Err(IngestError::LengthMismatch {
            ids: ids.len(),
            documents: documents.len(),
            embeddings: embeddings.len(),
        });
    }
    Ok(())
}

/// All vectors must share one length. Returns it, or `None` when empty.
pub(crate) fn common_dimension(embeddings: &[Vec<f32>]) -> Result<Option<usize>> {
    let Some(first) = embeddings.first() else {
        return Ok(None);
    };
    let expected = first.len();
    match embeddings.iter().find(|v| v.len() != expected) {
        Some(v) => Err(IngestError::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(Some(expected)),
    }
}
