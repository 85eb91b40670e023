use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{check_aligned, common_dimension, VectorStore};
use crate::error::{IngestError, Result};
use crate::models::Collection;

const UPSERT_CHUNK: usize = 256;

/// [`VectorStore`] backed by a Qdrant server. Record ids are not valid
/// Qdrant point ids, so each one maps to a UUID derived from its hash and
/// the record id travels in the payload.
pub struct QdrantStore {
    client: Qdrant,
    vector_size: u64,
}

impl QdrantStore {
    pub fn new(url: &str, vector_size: u64) -> Result<Self> {
        tracing::info!("Building Qdrant client for URL: {}", url);
        let client = Qdrant::from_url(url).build().map_err(|e| {
            tracing::error!("Qdrant client build failed: {:?}", e);
            e
        })?;
        tracing::info!("Qdrant client built successfully");

        Ok(Self {
            client,
            vector_size,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.client.list_collections().await?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn get_collection(&self, name: &str) -> Result<Collection> {
        if self.client.collection_exists(name).await? {
            Ok(Collection {
                name: name.to_string(),
            })
        } else {
            Err(IngestError::CollectionNotFound(name.to_string()))
        }
    }

    async fn create_collection(&self, name: &str) -> Result<Collection> {
        if self.client.collection_exists(name).await? {
            tracing::debug!("Collection {} already exists", name);
            return Ok(Collection {
                name: name.to_string(),
            });
        }

        let result = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(self.vector_size, Distance::Cosine)),
            )
            .await;

        match result {
            Ok(_) => {}
            // Another writer created it between the check and the create.
            Err(e) if is_already_exists(&e) => {
                tracing::debug!("Collection {} was created concurrently", name);
            }
            Err(e) => return Err(e.into()),
        }

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
        if let Some(dim) = common_dimension(embeddings)? {
            if dim as u64 != self.vector_size {
                return Err(IngestError::DimensionMismatch {
                    expected: self.vector_size as usize,
                    actual: dim,
                });
            }
        }

        let points: Vec<PointStruct> = ids
            .iter()
            .zip(documents)
            .zip(embeddings)
            .map(|((id, document), embedding)| {
                let mut payload = JsonMap::new();
                payload.insert("record_id".to_string(), JsonValue::String(id.clone()));
                payload.insert("text".to_string(), JsonValue::String(document.clone()));
                PointStruct::new(point_id(id), embedding.clone(), payload)
            })
            .collect();

        for chunk in points.chunks(UPSERT_CHUNK) {
            self.client
                .upsert_points(
                    UpsertPointsBuilder::new(&collection.name, chunk.to_vec()).wait(true),
                )
                .await?;
        }

        tracing::debug!("Upserted {} points into {}", ids.len(), collection.name);
        Ok(())
    }

    async fn count(&self, collection: &Collection) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&collection.name).exact(true))
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

fn is_already_exists(err: &QdrantError) -> bool {
    err.to_string().contains("already exists")
}

/// Stable UUID point id for a record id.
fn point_id(record_id: &str) -> String {
    let digest = Sha256::digest(record_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}
