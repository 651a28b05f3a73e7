use super::*;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::splitter::ChunkMetadata;

/// Loader that fabricates a fixed number of chunks per file, named after the
/// file so ids are deterministic per source.
struct FakeLoader {
    chunks_per_file: usize,
}

impl DocumentLoader for FakeLoader {
    fn load_and_split(
        &self,
        file_path: &Path,
        _chunk_size: usize,
        _chunk_overlap: usize,
    ) -> Result<Vec<Chunk>> {
        let source = file_path
            .file_name()
            .expect("Fake loader needs a file name")
            .to_string_lossy()
            .into_owned();

        Ok((0..self.chunks_per_file)
            .map(|i| Chunk {
                id: format!("{}#{}", source, i),
                content: format!("{} piece {}", source, i),
                metadata: ChunkMetadata {
                    source: source.clone(),
                    page: 0,
                    chunk_index: i,
                },
            })
            .collect())
    }
}

#[derive(Default)]
struct EmbedderState {
    batch_sizes: Mutex<Vec<usize>>,
    next_value: Mutex<usize>,
}

/// Embedder returning a distinct one-dimensional vector per text, in call
/// order, so alignment with chunks is checkable.
struct FakeEmbedder {
    state: Arc<EmbedderState>,
    fail_marker: Option<String>,
}

impl FakeEmbedder {
    fn new(state: Arc<EmbedderState>) -> Self {
        Self {
            state,
            fail_marker: None,
        }
    }

    fn failing_on(state: Arc<EmbedderState>, marker: &str) -> Self {
        Self {
            state,
            fail_marker: Some(marker.to_string()),
        }
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(marker) = &self.fail_marker {
            if texts.iter().any(|t| t.contains(marker)) {
                return Err(RagError::Transient("simulated embedding outage".to_string()));
            }
        }

        self.state
            .batch_sizes
            .lock()
            .expect("Lock poisoned")
            .push(texts.len());

        let mut next = self.state.next_value.lock().expect("Lock poisoned");
        Ok(texts
            .iter()
            .map(|_| {
                let vector = vec![*next as f32];
                *next += 1;
                vector
            })
            .collect())
    }
}

#[derive(Default)]
struct StoreState {
    records: Mutex<HashMap<String, (Chunk, Vec<f32>)>>,
    upsert_calls: Mutex<usize>,
    last_top_k: Mutex<Option<usize>>,
}

struct InMemoryStore {
    state: Arc<StoreState>,
}

impl VectorStore for InMemoryStore {
    fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::ArgumentMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        *self.state.upsert_calls.lock().expect("Lock poisoned") += 1;

        let mut records = self.state.records.lock().expect("Lock poisoned");
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            records.insert(chunk.id.clone(), (chunk.clone(), embedding.clone()));
        }
        Ok(())
    }

    fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut records = self.state.records.lock().expect("Lock poisoned");
        let before = records.len();
        records.retain(|_, (chunk, _)| chunk.metadata.source != source);
        Ok(before - records.len())
    }

    fn retrieve(&self, _query_vector: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        *self.state.last_top_k.lock().expect("Lock poisoned") = Some(top_k);

        let records = self.state.records.lock().expect("Lock poisoned");
        let mut chunks: Vec<Chunk> = records.values().map(|(c, _)| c.clone()).collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        chunks.truncate(top_k);
        Ok(chunks)
    }
}

fn write_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, b"placeholder").expect("Failed to write file");
    path
}

fn pipeline_with(
    chunks_per_file: usize,
    embedder: FakeEmbedder,
    store_state: Arc<StoreState>,
) -> IngestionPipeline {
    IngestionPipeline::new(
        Box::new(FakeLoader { chunks_per_file }),
        Box::new(embedder),
        Box::new(InMemoryStore { state: store_state }),
    )
}

#[test]
fn missing_file_is_file_not_found() {
    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(1, FakeEmbedder::new(embed_state), Arc::clone(&store_state));

    let result = pipeline.process_file(Path::new("/nonexistent/ghost.pdf"));
    assert!(matches!(result, Err(RagError::FileNotFound(_))));
    assert_eq!(*store_state.upsert_calls.lock().expect("Lock poisoned"), 0);
}

#[test]
fn file_with_no_chunks_is_a_successful_no_op() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&dir, "empty.pdf");

    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(
        0,
        FakeEmbedder::new(Arc::clone(&embed_state)),
        Arc::clone(&store_state),
    );

    let count = pipeline.process_file(&path).expect("Failed to process");
    assert_eq!(count, 0);
    assert!(embed_state.batch_sizes.lock().expect("Lock poisoned").is_empty());
    assert_eq!(*store_state.upsert_calls.lock().expect("Lock poisoned"), 0);
}

#[test]
fn embeds_in_batches_and_preserves_order() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&dir, "big.pdf");

    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(
        40,
        FakeEmbedder::new(Arc::clone(&embed_state)),
        Arc::clone(&store_state),
    );

    let count = pipeline.process_file(&path).expect("Failed to process");
    assert_eq!(count, 40);

    let batch_sizes = embed_state.batch_sizes.lock().expect("Lock poisoned");
    assert_eq!(*batch_sizes, vec![16, 16, 8]);

    // Embedding i belongs to chunk i
    let records = store_state.records.lock().expect("Lock poisoned");
    assert_eq!(records.len(), 40);
    for i in 0..40 {
        let (chunk, embedding) = &records[&format!("big.pdf#{}", i)];
        assert_eq!(chunk.metadata.chunk_index, i);
        assert_eq!(embedding, &vec![i as f32]);
    }
}

#[test]
fn small_file_uses_a_single_batch() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&dir, "small.pdf");

    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(
        7,
        FakeEmbedder::new(Arc::clone(&embed_state)),
        store_state,
    );

    pipeline.process_file(&path).expect("Failed to process");
    assert_eq!(
        *embed_state.batch_sizes.lock().expect("Lock poisoned"),
        vec![7]
    );
}

#[test]
fn reingesting_the_same_file_does_not_grow_the_store() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&dir, "stable.pdf");

    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(5, FakeEmbedder::new(embed_state), Arc::clone(&store_state));

    pipeline.process_file(&path).expect("Failed to process");
    pipeline.process_file(&path).expect("Failed to process");

    assert_eq!(store_state.records.lock().expect("Lock poisoned").len(), 5);
}

#[test]
fn one_failing_file_does_not_block_the_others() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let good1 = write_file(&dir, "first.pdf");
    let bad = write_file(&dir, "corrupt.pdf");
    let good2 = write_file(&dir, "third.pdf");

    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());
    let pipeline = pipeline_with(
        2,
        FakeEmbedder::failing_on(embed_state, "corrupt"),
        Arc::clone(&store_state),
    );

    let result = pipeline.process_files(&[good1, bad, good2]);

    assert_eq!(result.processed, vec!["first.pdf", "third.pdf"]);
    assert_eq!(result.failed.len(), 1);
    assert!(result.failed["corrupt.pdf"].contains("simulated embedding outage"));
    assert_eq!(result.message, "Processed 2 of 3 files (1 failed)");

    // Only chunks from the successful files landed
    let records = store_state.records.lock().expect("Lock poisoned");
    assert_eq!(records.len(), 4);
}

#[test]
fn retrieval_clamps_top_k_to_valid_range() {
    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());

    let pipeline = RetrievalPipeline::new(
        Box::new(FakeEmbedder::new(embed_state)),
        Box::new(InMemoryStore {
            state: Arc::clone(&store_state),
        }),
    );

    pipeline.retrieve("question", 0).expect("Failed to retrieve");
    assert_eq!(*store_state.last_top_k.lock().expect("Lock poisoned"), Some(1));

    pipeline.retrieve("question", 500).expect("Failed to retrieve");
    assert_eq!(
        *store_state.last_top_k.lock().expect("Lock poisoned"),
        Some(100)
    );

    pipeline.retrieve("question", 5).expect("Failed to retrieve");
    assert_eq!(*store_state.last_top_k.lock().expect("Lock poisoned"), Some(5));
}

#[test]
fn retrieval_returns_stored_chunks() {
    let embed_state = Arc::new(EmbedderState::default());
    let store_state = Arc::new(StoreState::default());

    let store = InMemoryStore {
        state: Arc::clone(&store_state),
    };
    let chunk = Chunk {
        id: "c1".to_string(),
        content: "indexed text".to_string(),
        metadata: ChunkMetadata {
            source: "a.pdf".to_string(),
            page: 0,
            chunk_index: 0,
        },
    };
    store
        .upsert(std::slice::from_ref(&chunk), &[vec![0.5]])
        .expect("Failed to seed store");

    let pipeline = RetrievalPipeline::new(Box::new(FakeEmbedder::new(embed_state)), Box::new(store));

    let results = pipeline.retrieve("question", 3).expect("Failed to retrieve");
    assert_eq!(results, vec![chunk]);
}

/// Embedder that returns nothing, as a degenerate remote response.
struct EmptyEmbedder;

impl EmbeddingProvider for EmptyEmbedder {
    fn get_embeddings(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }
}

#[test]
fn retrieval_rejects_a_missing_query_embedding() {
    let store_state = Arc::new(StoreState::default());
    let pipeline = RetrievalPipeline::new(
        Box::new(EmptyEmbedder),
        Box::new(InMemoryStore { state: store_state }),
    );

    let result = pipeline.retrieve("question", 5);
    assert!(matches!(
        result,
        Err(RagError::UnparseableResponse { .. })
    ));
}
