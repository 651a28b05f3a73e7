// Vector store module
// Remote collection of (id, vector, text, metadata) tuples with upsert,
// delete-by-source, and nearest-neighbor retrieval.

pub mod chroma;

pub use chroma::ChromaStore;

use crate::Result;
use crate::splitter::Chunk;

/// Capability set of a vector collection.
pub trait VectorStore {
    /// Insert-or-overwrite aligned (chunk, embedding) pairs by chunk id.
    fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Delete every chunk whose metadata `source` matches; returns the number
    /// deleted. A source with no chunks is a no-op, not an error.
    fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Up to `top_k` chunks ranked nearest-first by the store's similarity
    /// metric. No similarity score is attached to the returned chunks.
    fn retrieve(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Chunk>>;
}

/// Collection name for a base name and embedding model: chunks embedded by
/// different models must never share a vector space.
#[inline]
pub fn collection_name(base_name: &str, model: &str) -> String {
    let sanitized: String = model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", base_name, sanitized)
}
