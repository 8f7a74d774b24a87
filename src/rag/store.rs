//! Abstract interface over the persistent vector index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::PipelineError;

/// A persisted chunk: text plus the metadata needed to trace it back to
/// its source page. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Content hash; identical re-ingested chunks collide on purpose.
    pub chunk_id: String,
    pub content: String,
    /// Source file path.
    pub source: String,
    pub folder: String,
    pub page_number: i64,
    pub chunk_index: i64,
}

/// Result of a similarity search, higher score is better.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Content-hash identity for a chunk. Re-running ingestion over unchanged
/// sources reproduces the same ids, which is what makes re-ingestion
/// idempotent at the store level.
pub fn chunk_id(source: &str, page_number: usize, chunk_index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0x1f]);
    hasher.update(page_number.to_le_bytes());
    hasher.update([0x1f]);
    hasher.update(chunk_index.to_le_bytes());
    hasher.update([0x1f]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks with their embeddings in one transaction. Returns the
    /// number of rows actually added (duplicates are ignored). Embeddings
    /// must share one dimension, and it must match whatever the store
    /// already holds.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, PipelineError>;

    /// Brute-force nearest-neighbor search over all stored embeddings.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, PipelineError>;

    async fn count(&self) -> Result<usize, PipelineError>;
}
