//! In-process [`VectorStore`] for tests and throwaway runs. Nothing is
//! persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::{check_aligned, common_dimension, VectorStore};
use crate::error::{IngestError, Result};
use crate::models::{Collection, CollectionEntry};

#[derive(Default)]
struct StoredCollection {
    dimension: Option<usize>,
    entries: HashMap<String, (String, Vec<f32>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<IndexMap<String, StoredCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_entry(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<CollectionEntry>> {
        let collections = self.collections.read().await;
        let stored = collections
            .get(&collection.name)
            .ok_or_else(|| IngestError::CollectionNotFound(collection.name.clone()))?;

        Ok(stored
            .entries
            .get(id)
            .map(|(document, embedding)| CollectionEntry {
                id: id.to_string(),
                document: document.clone(),
                embedding: embedding.clone(),
            }))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn get_collection(&self, name: &str) -> Result<Collection> {
        if self.collections.read().await.contains_key(name) {
            Ok(Collection {
                name: name.to_string(),
            })
        } else {
            Err(IngestError::CollectionNotFound(name.to_string()))
        }
    }

    async fn create_collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(Collection {
            name: name.to_string(),
        })
    }

    async fn upsert(
        &self,
        collection: &Collection,
        ids: &[String],
        documents: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        check_aligned(ids, documents, embeddings)?;
        let dimension = common_dimension(embeddings)?;

        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(&collection.name)
            .ok_or_else(|| IngestError::CollectionNotFound(collection.name.clone()))?;

        if let Some(dim) = dimension {
            let expected = *stored.dimension.get_or_insert(dim);
            if expected != dim {
                return Err(IngestError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
        }

        for ((id, document), embedding) in ids.iter().zip(documents).zip(embeddings) {
            stored
                .entries
                .insert(id.clone(), (document.clone(), embedding.clone()));
        }
        Ok(())
    }

    async fn count(&self, collection: &Collection) -> Result<u64> {
        let collections = self.collections.read().await;
        collections
            .get(&collection.name)
            .map(|c| c.entries.len() as u64)
            .ok_or_else(|| IngestError::CollectionNotFound(collection.name.clone()))
    }
}
