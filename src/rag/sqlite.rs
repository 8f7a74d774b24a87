//! SQLite-backed vector store.
//!
//! Embeddings live as little-endian f32 BLOBs next to their chunk text;
//! search is brute-force cosine similarity, which is plenty for a corpus
//! of tens to low hundreds of PDFs.
//!
//! Whether a store exists is decided by inspecting the path, never by
//! pattern-matching an error: `open` refuses to create a database and
//! `create` seeds a fresh one, so an unrecognized failure from either
//! propagates unchanged.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{SearchResult, StoredChunk, VectorStore};
use crate::core::errors::PipelineError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    /// Open an existing store. Fails if the database file does not exist.
    pub async fn open(db_path: &Path) -> Result<Self, PipelineError> {
        Self::connect(db_path, false).await
    }

    /// Create a new store at `db_path` and initialize its schema.
    pub async fn create(db_path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::connect(db_path, true).await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Open the store at `db_path`, creating and seeding the schema on
    /// first run. The branch is chosen by inspecting the path.
    pub async fn open_or_create(db_path: &Path) -> Result<(Self, bool), PipelineError> {
        if db_path.exists() {
            Ok((Self::open(db_path).await?, false))
        } else {
            Ok((Self::create(db_path).await?, true))
        }
    }

    async fn connect(db_path: &Path, create_if_missing: bool) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                folder TEXT NOT NULL DEFAULT '',
                page_number INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            folder: row.get("folder"),
            page_number: row.get("page_number"),
            chunk_index: row.get("chunk_index"),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, PipelineError> {
        if items.is_empty() {
            return Ok(0);
        }

        let dimension = items[0].1.len();
        if items.iter().any(|(_, embedding)| embedding.len() != dimension) {
            return Err(PipelineError::Api(
                "batch contains embeddings of inconsistent dimension".to_string(),
            ));
        }
        // Cosine similarity across dimensions is meaningless, so a batch
        // that disagrees with what the store already holds (a different
        // embedding model, typically) is rejected up front.
        let existing_bytes: Option<i64> =
            sqlx::query_scalar("SELECT LENGTH(embedding) FROM chunks LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        if let Some(bytes) = existing_bytes {
            let stored_dimension = bytes as usize / 4;
            if stored_dimension != dimension {
                return Err(PipelineError::Api(format!(
                    "batch embedding dimension {} does not match store dimension {}",
                    dimension, stored_dimension
                )));
            }
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        let created_at = chrono::Utc::now().to_rfc3339();

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let result = sqlx::query(
                "INSERT OR IGNORE INTO chunks
                    (chunk_id, content, source, folder, page_number, chunk_index, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&chunk.folder)
            .bind(chunk.page_number)
            .bind(chunk.chunk_index)
            .bind(&blob)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, folder, page_number, chunk_index, embedding
             FROM chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<SearchResult> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                SearchResult {
                    chunk: Self::row_to_chunk(row),
                    score: Self::cosine_similarity(query_embedding, &stored),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::chunk_id;

    fn make_chunk(source: &str, page: usize, index: usize, content: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: chunk_id(source, page, index, content),
            content: content.to_string(),
            source: source.to_string(),
            folder: "pdf_reports".to_string(),
            page_number: page as i64,
            chunk_index: index as i64,
        }
    }

    #[tokio::test]
    async fn open_fails_when_store_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("vector_store.db");

        let result = SqliteVectorStore::open(&missing).await;
        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn create_then_open_round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");

        let store = SqliteVectorStore::create(&path).await.unwrap();
        store
            .insert_batch(vec![
                (make_chunk("a.pdf", 1, 0, "alpha"), vec![1.0, 0.0]),
                (make_chunk("a.pdf", 1, 1, "beta"), vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);

        let results = reopened.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.content, "alpha");
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn duplicate_chunks_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");
        let store = SqliteVectorStore::create(&path).await.unwrap();

        let first = store
            .insert_batch(vec![(make_chunk("a.pdf", 1, 0, "alpha"), vec![1.0])])
            .await
            .unwrap();
        let second = store
            .insert_batch(vec![
                (make_chunk("a.pdf", 1, 0, "alpha"), vec![1.0]),
                (make_chunk("a.pdf", 1, 1, "beta"), vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn open_or_create_reports_the_branch_taken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");

        let (store, created) = SqliteVectorStore::open_or_create(&path).await.unwrap();
        assert!(created);
        drop(store);

        let (_, created) = SqliteVectorStore::open_or_create(&path).await.unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn zero_limit_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");
        let store = SqliteVectorStore::create(&path).await.unwrap();

        store
            .insert_batch(vec![(make_chunk("a.pdf", 1, 0, "alpha"), vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn mismatched_embedding_dimension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");
        let store = SqliteVectorStore::create(&path).await.unwrap();

        store
            .insert_batch(vec![(
                make_chunk("a.pdf", 1, 0, "alpha"),
                vec![1.0, 0.0, 0.0],
            )])
            .await
            .unwrap();

        let result = store
            .insert_batch(vec![(make_chunk("b.pdf", 1, 0, "beta"), vec![1.0, 0.0])])
            .await;

        assert!(matches!(result, Err(PipelineError::Api(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn inconsistent_batch_dimensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");
        let store = SqliteVectorStore::create(&path).await.unwrap();

        let result = store
            .insert_batch(vec![
                (make_chunk("a.pdf", 1, 0, "alpha"), vec![1.0, 0.0]),
                (make_chunk("a.pdf", 1, 1, "beta"), vec![1.0]),
            ])
            .await;

        assert!(matches!(result, Err(PipelineError::Api(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.db");
        let store = SqliteVectorStore::create(&path).await.unwrap();

        store
            .insert_batch(vec![
                (make_chunk("a.pdf", 1, 0, "near"), vec![0.9, 0.1, 0.0]),
                (make_chunk("a.pdf", 1, 1, "far"), vec![0.0, 0.1, 0.9]),
                (make_chunk("a.pdf", 1, 2, "middle"), vec![0.5, 0.5, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "near");
        assert_eq!(results[1].chunk.content, "middle");
    }
}
