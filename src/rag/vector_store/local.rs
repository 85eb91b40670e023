//! Directory-backed [`VectorStore`] on SQLite.
//!
//! The store directory holds a single database file. Embeddings are kept as
//! little-endian `f32` blobs; each collection remembers the dimension of its
//! first write and rejects vectors of any other length.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{check_aligned, common_dimension, VectorStore};
use crate::error::{IngestError, Result};
use crate::models::{Collection, CollectionEntry};

pub const DB_FILE: &str = "vectors.sqlite3";

pub struct LocalStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl LocalStore {
    /// Opens the store in `dir`, creating the directory, database and schema
    /// as needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| IngestError::StoreDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(DB_FILE);
        tracing::info!("Opening local vector store at {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool, path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_entry(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<CollectionEntry>> {
        let row = sqlx::query(
            "SELECT id, document, embedding FROM entries WHERE collection = ? AND id = ?",
        )
        .bind(&collection.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            CollectionEntry {
                id: row.get("id"),
                document: row.get("document"),
                embedding: blob_to_vec(&blob),
            }
        }))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn get_collection(&self, name: &str) -> Result<Collection> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM collections WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        found
            .map(|name| Collection { name })
            .ok_or_else(|| IngestError::CollectionNotFound(name.to_string()))
    }

    async fn create_collection(&self, name: &str) -> Result<Collection> {
        sqlx::query(
            "INSERT INTO collections (name, dimension, created_at) VALUES (?, NULL, ?) \
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

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
        let Some(dimension) = common_dimension(embeddings)? else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;

        let stored: Option<Option<i64>> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(&collection.name)
                .fetch_optional(&mut *tx)
                .await?;

        match stored {
            None => return Err(IngestError::CollectionNotFound(collection.name.clone())),
            Some(Some(expected)) if expected as usize != dimension => {
                return Err(IngestError::DimensionMismatch {
                    expected: expected as usize,
                    actual: dimension,
                });
            }
            Some(Some(_)) => {}
            Some(None) => {
                sqlx::query("UPDATE collections SET dimension = ? WHERE name = ?")
                    .bind(dimension as i64)
                    .bind(&collection.name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let now = chrono::Utc::now().timestamp();
        for ((id, document), embedding) in ids.iter().zip(documents).zip(embeddings) {
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, document, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&collection.name)
            .bind(id)
            .bind(document)
            .bind(vec_to_blob(embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Upserted {} entries into {}", ids.len(), collection.name);
        Ok(())
    }

    async fn count(&self, collection: &Collection) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&collection.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::vector_store::ensure_collection;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_open_creates_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("nested").join("vector_db");

        let store = LocalStore::open(&store_dir).await.unwrap();
        assert!(store.path().exists());
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_with_url_like_directory_names() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["what?db", "v%20db", "run#2"] {
            let store_dir = dir.path().join(name);
            let store = LocalStore::open(&store_dir).await.unwrap();
            let collection = store.create_collection("scienceqa").await.unwrap();
            store
                .upsert(&collection, &strings(&["Q1"]), &strings(&["doc"]), &[vec![1.0, 2.0]])
                .await
                .unwrap();

            assert_eq!(store.path(), store_dir.join(DB_FILE));
            assert!(store_dir.join(DB_FILE).exists());
            assert_eq!(store.count(&collection).await.unwrap(), 1);
            store.close().await;
        }
    }

    #[tokio::test]
    async fn test_create_collection_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.create_collection("scienceqa").await.unwrap();
        store.create_collection("scienceqa").await.unwrap();
        ensure_collection(&store, "scienceqa").await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["scienceqa"]);
    }

    #[tokio::test]
    async fn test_reupsert_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let collection = ensure_collection(&store, "scienceqa").await.unwrap();

        let ids = strings(&["Q1", "Q2"]);
        let docs = strings(&["one", "two"]);
        let vectors = vec![vec![0.25, -1.5, 3.0], vec![1.0, 0.0, 0.0]];

        store.upsert(&collection, &ids, &docs, &vectors).await.unwrap();
        store.upsert(&collection, &ids, &docs, &vectors).await.unwrap();

        assert_eq!(store.count(&collection).await.unwrap(), 2);
        let entry = store.get_entry(&collection, "Q1").await.unwrap().unwrap();
        assert_eq!(entry.document, "one");
        assert_eq!(entry.embedding, vec![0.25, -1.5, 3.0]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let collection = ensure_collection(&store, "scienceqa").await.unwrap();

        store
            .upsert(&collection, &strings(&["Q1"]), &strings(&["old"]), &[vec![1.0, 2.0]])
            .await
            .unwrap();
        store
            .upsert(&collection, &strings(&["Q1"]), &strings(&["new"]), &[vec![3.0, 4.0]])
            .await
            .unwrap();

        let entry = store.get_entry(&collection, "Q1").await.unwrap().unwrap();
        assert_eq!(entry.document, "new");
        assert_eq!(entry.embedding, vec![3.0, 4.0]);
        assert_eq!(store.count(&collection).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let collection = ensure_collection(&store, "scienceqa").await.unwrap();

        let err = store
            .upsert(&collection, &strings(&["Q1"]), &strings(&["a", "b"]), &[vec![1.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::LengthMismatch { .. }));
        assert_eq!(store.count(&collection).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let collection = ensure_collection(&store, "scienceqa").await.unwrap();

        store
            .upsert(&collection, &strings(&["Q1"]), &strings(&["a"]), &[vec![0.0; 4]])
            .await
            .unwrap();
        let err = store
            .upsert(&collection, &strings(&["Q2"]), &strings(&["b"]), &[vec![0.0; 8]])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::DimensionMismatch {
                expected: 4,
                actual: 8
            }
        ));
        assert_eq!(store.count(&collection).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let ghost = Collection {
            name: "ghost".to_string(),
        };

        assert!(matches!(
            store.get_collection("ghost").await,
            Err(IngestError::CollectionNotFound(_))
        ));
        assert!(matches!(
            store
                .upsert(&ghost, &strings(&["Q1"]), &strings(&["a"]), &[vec![1.0]])
                .await,
            Err(IngestError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = LocalStore::open(dir.path()).await.unwrap();
            let collection = ensure_collection(&store, "scienceqa").await.unwrap();
            store
                .upsert(&collection, &strings(&["Q1"]), &strings(&["kept"]), &[vec![1.0, 2.0]])
                .await
                .unwrap();
            store.close().await;
        }

        let store = LocalStore::open(dir.path()).await.unwrap();
        let collection = store.get_collection("scienceqa").await.unwrap();
        assert_eq!(store.count(&collection).await.unwrap(), 1);
        let entry = store.get_entry(&collection, "Q1").await.unwrap().unwrap();
        assert_eq!(entry.document, "kept");
    }

    #[test]
    fn test_blob_encoding() {
        let v = vec![1.0f32, -2.5, 3.125, 0.0];
        let blob = vec_to_blob(&v);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob), v);
    }
}
