pub mod embeddings;
pub mod vector_store;

use tokio_util::sync::CancellationToken;

use self::embeddings::{embed_batch, Embedder};
use self::vector_store::{ensure_collection, VectorStore};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::indexer::{load_dataset, synthesize_document};
use crate::models::{Dataset, IngestReport};

/// Loads the dataset, embeds one document per record and upserts the
/// results into the configured collection.
pub struct Ingestor {
    config: IngestConfig,
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(
        config: IngestConfig,
        embedder: Box<dyn Embedder>,
        store: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
        }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<IngestReport> {
        let mut dataset = load_dataset(&self.config.dataset_path)?;
        if let Some(limit) = self.config.limit {
            dataset.truncate(limit);
        }

        let (ids, documents) = prepare_documents(&dataset)?;
        tracing::info!(
            "Prepared {} documents for collection {}",
            documents.len(),
            self.config.collection
        );

        if self.config.dry_run {
            return Ok(IngestReport {
                collection: self.config.collection.clone(),
                records_loaded: dataset.len(),
                upserted: 0,
                dimension: None,
                entries_in_collection: self.existing_count().await?,
                dry_run: true,
            });
        }

        let collection = ensure_collection(self.store.as_ref(), &self.config.collection).await?;

        if documents.is_empty() {
            return Ok(IngestReport {
                collection: collection.name.clone(),
                records_loaded: 0,
                upserted: 0,
                dimension: None,
                entries_in_collection: self.store.count(&collection).await?,
                dry_run: false,
            });
        }

        tracing::info!(
            "Embedding {} documents with {} (batch size {})",
            documents.len(),
            self.embedder.model_name(),
            self.config.embedding.batch_size
        );
        let embeddings = embed_batch(
            self.embedder.as_ref(),
            &documents,
            self.config.embedding.batch_size,
            self.config.embedding.show_progress,
            cancel,
        )?;
        let dimension = embeddings.first().map(Vec::len);

        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        self.store
            .upsert(&collection, &ids, &documents, &embeddings)
            .await?;
        tracing::info!("Upserted {} entries into {}", ids.len(), collection.name);

        Ok(IngestReport {
            collection: collection.name.clone(),
            records_loaded: dataset.len(),
            upserted: ids.len(),
            dimension,
            entries_in_collection: self.store.count(&collection).await?,
            dry_run: false,
        })
    }

    /// Entry count of the configured collection, or zero if it does not
    /// exist. Never creates anything.
    async fn existing_count(&self) -> Result<u64> {
        let names = self.store.list_collections().await?;
        if !names.iter().any(|n| n == &self.config.collection) {
            return Ok(0);
        }
        let collection = self.store.get_collection(&self.config.collection).await?;
        self.store.count(&collection).await
    }
}

/// Synthesizes every record, returning ids and documents aligned by
/// position. The first invalid record aborts with its id attached.
pub fn prepare_documents(dataset: &Dataset) -> Result<(Vec<String>, Vec<String>)> {
    let mut ids = Vec::with_capacity(dataset.len());
    let mut documents = Vec::with_capacity(dataset.len());

    for (id, record) in dataset {
        let document = synthesize_document(record).map_err(|e| IngestError::InvalidRecord {
            id: id.clone(),
            source: Box::new(e),
        })?;
        ids.push(id.clone());
        documents.push(document);
    }

    Ok((ids, documents))
}
