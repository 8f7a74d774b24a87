//! Corpus-to-vector-store synchronization.
//!
//! Discover PDFs across the configured folders, split them into chunks,
//! embed the chunks and merge them into the persistent store. One logical
//! write transaction per run: open (or create) the store, insert the
//! batch, commit.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::chunker::Chunker;
use super::loader::{self, PageDocument};
use crate::core::config::Settings;
use crate::core::errors::PipelineError;
use crate::llm::LlmProvider;
use crate::rag::{chunk_id, SqliteVectorStore, StoredChunk, VectorStore};

/// Summary of one synchronization run, logged for capacity planning.
#[derive(Debug)]
pub struct IngestReport {
    pub files_per_folder: BTreeMap<String, usize>,
    pub documents: usize,
    pub chunks: usize,
    /// Rows actually added; lower than `chunks` when re-ingesting
    /// already-indexed content.
    pub inserted: usize,
    pub store_created: bool,
    /// Wall-clock time of the embed+persist step, the dominant cost.
    pub embed_persist: Duration,
}

#[derive(Debug)]
pub enum IngestOutcome {
    /// No documents were extracted anywhere; the store was not touched and
    /// no embedding call was made.
    NothingToDo,
    Synced(IngestReport),
}

pub struct IngestPipeline {
    settings: Settings,
    provider: Arc<dyn LlmProvider>,
    store_path: PathBuf,
}

impl IngestPipeline {
    pub fn new(settings: Settings, provider: Arc<dyn LlmProvider>, store_path: PathBuf) -> Self {
        Self {
            settings,
            provider,
            store_path,
        }
    }

    pub async fn run(&self, folders: &[PathBuf]) -> Result<IngestOutcome, PipelineError> {
        let (documents, files_per_folder) = loader::load_folders(folders)?;
        for (folder, files) in &files_per_folder {
            tracing::info!("{}: {} pdf files discovered", folder, files);
        }

        if documents.is_empty() {
            tracing::info!("no new documents to add");
            return Ok(IngestOutcome::NothingToDo);
        }

        let report = self.sync_documents(documents, files_per_folder).await?;
        Ok(IngestOutcome::Synced(report))
    }

    /// The sync half of the pipeline, separated from filesystem discovery
    /// so it can be driven with already-loaded documents.
    pub async fn sync_documents(
        &self,
        documents: Vec<PageDocument>,
        files_per_folder: BTreeMap<String, usize>,
    ) -> Result<IngestReport, PipelineError> {
        let chunker = Chunker::new(self.settings.chunk_size, self.settings.chunk_overlap);
        let chunks = chunker.split_documents(&documents);
        tracing::info!(
            "loaded {} documents, produced {} chunks",
            documents.len(),
            chunks.len()
        );

        let started = Instant::now();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .provider
            .embed(&texts, &self.settings.embedding_model)
            .await?;
        if embeddings.len() != chunks.len() {
            return Err(PipelineError::Api(format!(
                "embedding model returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        let dimension = embeddings.first().map(|v| v.len()).unwrap_or(0);
        if dimension == 0 || embeddings.iter().any(|v| v.len() != dimension) {
            return Err(PipelineError::Api(
                "embedding model returned vectors of inconsistent dimension".to_string(),
            ));
        }

        let (store, store_created) = SqliteVectorStore::open_or_create(&self.store_path).await?;
        if store_created {
            tracing::info!("created new vector store at {}", self.store_path.display());
        }

        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let stored = StoredChunk {
                    chunk_id: chunk_id(
                        &chunk.source,
                        chunk.page_number,
                        chunk.chunk_index,
                        &chunk.text,
                    ),
                    content: chunk.text,
                    source: chunk.source,
                    folder: chunk.folder,
                    page_number: chunk.page_number as i64,
                    chunk_index: chunk.chunk_index as i64,
                };
                (stored, embedding)
            })
            .collect();
        let total_chunks = items.len();

        let inserted = store.insert_batch(items).await?;
        let embed_persist = started.elapsed();

        tracing::info!(
            "embedding update completed: {} chunks ({} new) persisted in {:.1}s",
            total_chunks,
            inserted,
            embed_persist.as_secs_f64()
        );

        Ok(IngestReport {
            files_per_folder,
            documents: documents.len(),
            chunks: total_chunks,
            inserted,
            store_created,
            embed_persist,
        })
    }
}
