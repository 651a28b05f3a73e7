// Deterministic chunk identity
// Same (content, metadata) always hashes to the same id, which makes
// re-ingesting an unchanged file an upsert no-op instead of a duplicate.


use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::splitter::ChunkMetadata;

/// Hex digest length kept per id; 128 bits is collision-negligible at this scale.
const ID_HEX_CHARS: usize = 32;

/// Derive a stable, content-addressed id for a chunk.
///
/// Metadata is canonicalized as key=value pairs sorted by key, so the id is
/// independent of field ordering and process history.
#[inline]
pub fn derive_id(content: &str, metadata: &ChunkMetadata) -> String {
    let mut pairs = BTreeMap::new();
    pairs.insert("chunk_index", metadata.chunk_index.to_string());
    pairs.insert("page", metadata.page.to_string());
    pairs.insert("source", metadata.source.clone());

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    for (key, value) in &pairs {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b";");
    }

    let digest = format!("{:x}", hasher.finalize());
    digest.chars().take(ID_HEX_CHARS).collect()
}
