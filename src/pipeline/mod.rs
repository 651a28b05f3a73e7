#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::embedder::EmbeddingProvider;
use crate::splitter::{Chunk, DocumentLoader};
use crate::store::VectorStore;
use crate::{RagError, Result};

pub const DEFAULT_EMBED_BATCH_SIZE: usize = 16;
pub const DEFAULT_CHUNK_SIZE: usize = 256;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 100;

/// Outcome of a multi-file ingestion run. Failures are isolated per file, so
/// both lists can be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionResult {
    /// Sources ingested successfully, in input order.
    pub processed: Vec<String>,
    /// Source to error message, for files that failed.
    pub failed: BTreeMap<String, String>,
    pub message: String,
}

/// Document-to-vector-store pipeline: split, embed in batches, upsert.
pub struct IngestionPipeline {
    loader: Box<dyn DocumentLoader>,
    embedder: Box<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
    batch_size: usize,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        loader: Box<dyn DocumentLoader>,
        embedder: Box<dyn EmbeddingProvider>,
        store: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            loader,
            embedder,
            store,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_chunk_budget(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Ingest a single file end to end. Returns the number of chunks upserted;
    /// a file that yields no text is a successful no-op.
    #[inline]
    pub fn process_file(&self, file_path: &Path) -> Result<usize> {
        if !file_path.is_file() {
            return Err(RagError::FileNotFound(file_path.to_path_buf()));
        }

        let chunks = self
            .loader
            .load_and_split(file_path, self.chunk_size, self.chunk_overlap)?;

        if chunks.is_empty() {
            info!("No chunks produced for {}, nothing to store", file_path.display());
            return Ok(0);
        }

        let embeddings = self.embed_chunks(&chunks)?;
        self.store.upsert(&chunks, &embeddings)?;

        info!("Ingested {} chunks from {}", chunks.len(), file_path.display());
        Ok(chunks.len())
    }

    /// Ingest several files, isolating failures so one bad file never blocks
    /// the rest.
    #[inline]
    pub fn process_files(&self, file_paths: &[PathBuf]) -> IngestionResult {
        let mut processed = Vec::new();
        let mut failed = BTreeMap::new();

        for file_path in file_paths {
            let source = file_path
                .file_name()
                .map_or_else(|| file_path.display().to_string(), |n| n.to_string_lossy().into_owned());

            match self.process_file(file_path) {
                Ok(count) => {
                    debug!("Processed {} ({} chunks)", source, count);
                    processed.push(source);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", source, e);
                    failed.insert(source, e.to_string());
                }
            }
        }

        let message = format!(
            "Processed {} of {} files ({} failed)",
            processed.len(),
            file_paths.len(),
            failed.len()
        );

        IngestionResult {
            processed,
            failed,
            message,
        }
    }

    /// Embed chunk contents in fixed-size batches, preserving chunk order.
    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            embeddings.extend(self.embedder.get_embeddings(&texts)?);
        }

        Ok(embeddings)
    }
}

/// Query-side pipeline: embed the query text and ask the store for neighbors.
pub struct RetrievalPipeline {
    embedder: Box<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
}

impl RetrievalPipeline {
    #[inline]
    pub fn new(embedder: Box<dyn EmbeddingProvider>, store: Box<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve the chunks nearest to `query`. `top_k` is clamped to
    /// [1, 100] rather than rejected.
    #[inline]
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        let top_k = top_k.clamp(MIN_TOP_K, MAX_TOP_K);

        let embeddings = self.embedder.get_embeddings(&[query.to_string()])?;
        let query_vector = embeddings.into_iter().next().ok_or_else(|| {
            RagError::UnparseableResponse {
                service: "embed".to_string(),
                detail: "no embedding returned for query".to_string(),
            }
        })?;

        self.store.retrieve(&query_vector, top_k)
    }
}
