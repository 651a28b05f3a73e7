
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::splitter::{Chunk, ChunkMetadata};
use crate::store::VectorStore;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Tuples per upsert request, bounding request size. A chunk's id, vector,
/// content, and metadata always travel in the same request.
const UPSERT_BATCH_SIZE: usize = 1000;

/// HTTP client for a Chroma-style collection API.
///
/// The collection is created on first access (get-or-create) and its handle
/// memoized; re-creation is idempotent, so a lost race costs one extra call.
pub struct ChromaStore {
    base_url: Url,
    collection: String,
    agent: ureq::Agent,
    collection_id: Mutex<Option<String>>,
    batch_size: usize,
}

impl ChromaStore {
    #[inline]
    pub fn new(base_url: Url, collection: String) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            base_url,
            collection,
            agent,
            collection_id: Mutex::new(None),
            batch_size: UPSERT_BATCH_SIZE,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RagError::VectorStore(format!("Invalid store URL '{}': {}", path, e)))?;

        let request_json = body.to_string();

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::VectorStore(format!("Request to {} failed: {}", path, e)))?;

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_text)
            .map_err(|e| RagError::VectorStore(format!("Invalid JSON from {}: {}", path, e)))
    }

    /// Get-or-create the collection and return its memoized id.
    fn collection_id(&self) -> Result<String> {
        let mut cached = self
            .collection_id
            .lock()
            .map_err(|_| RagError::VectorStore("Collection handle lock poisoned".to_string()))?;

        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        debug!("Creating or fetching collection '{}'", self.collection);

        let body = json!({ "name": self.collection, "get_or_create": true });
        let response = self.post_json("api/v1/collections", &body)?;

        let id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RagError::VectorStore("Collection response missing 'id' field".to_string())
            })?
            .to_string();

        info!("Using collection '{}' (id {})", self.collection, id);
        *cached = Some(id.clone());
        Ok(id)
    }

    fn collection_path(&self, suffix: &str) -> Result<String> {
        let id = self.collection_id()?;
        Ok(format!("api/v1/collections/{}/{}", id, suffix))
    }
}

impl VectorStore for ChromaStore {
    #[inline]
    fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::ArgumentMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        if chunks.is_empty() {
            debug!("No chunks to upsert");
            return Ok(());
        }

        let upsert_path = self.collection_path("upsert")?;
        let total = chunks.len();

        for start in (0..total).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(total);
            let batch_chunks = &chunks[start..end];
            let batch_embeddings = &embeddings[start..end];

            let body = json!({
                "ids": batch_chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
                "embeddings": batch_embeddings,
                "documents": batch_chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>(),
                "metadatas": batch_chunks.iter().map(|c| &c.metadata).collect::<Vec<_>>(),
            });

            self.post_json(&upsert_path, &body)?;

            info!(
                "Upserted batch {}-{} of {} chunks into collection '{}'",
                start + 1,
                end,
                total,
                self.collection
            );
        }

        Ok(())
    }

    #[inline]
    fn delete_by_source(&self, source: &str) -> Result<usize> {
        let get_path = self.collection_path("get")?;
        let body = json!({ "where": { "source": source }, "include": [] });
        let response = self.post_json(&get_path, &body)?;

        let ids: Vec<String> = response
            .get("ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            info!("No chunks found for source '{}'", source);
            return Ok(0);
        }

        let delete_path = self.collection_path("delete")?;
        self.post_json(&delete_path, &json!({ "ids": ids }))?;

        info!(
            "Deleted {} chunks for source '{}' from collection '{}'",
            ids.len(),
            source,
            self.collection
        );
        Ok(ids.len())
    }

    #[inline]
    fn retrieve(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        let query_path = self.collection_path("query")?;
        let body = json!({
            "query_embeddings": [query_vector],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self.post_json(&query_path, &body)?;

        // Results arrive as parallel arrays nested per query; we send one query
        let ids = first_inner_array(&response, "ids")?;
        let documents = first_inner_array(&response, "documents")?;
        let metadatas = first_inner_array(&response, "metadatas")?;

        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(RagError::VectorStore(format!(
                "Query response arrays misaligned: {} ids, {} documents, {} metadatas",
                ids.len(),
                documents.len(),
                metadatas.len()
            )));
        }

        let mut chunks = Vec::with_capacity(ids.len());
        for ((id, document), metadata) in ids.iter().zip(&documents).zip(&metadatas) {
            let id = id
                .as_str()
                .ok_or_else(|| RagError::VectorStore("Non-string chunk id".to_string()))?;
            let content = document
                .as_str()
                .ok_or_else(|| RagError::VectorStore("Non-string document".to_string()))?;
            let metadata: ChunkMetadata = serde_json::from_value((*metadata).clone())
                .map_err(|e| RagError::VectorStore(format!("Invalid chunk metadata: {}", e)))?;

            chunks.push(Chunk {
                id: id.to_string(),
                content: content.to_string(),
                metadata,
            });
        }

        debug!("Retrieved {} chunks from collection '{}'", chunks.len(), self.collection);
        Ok(chunks)
    }
}

fn first_inner_array<'a>(response: &'a Value, field: &str) -> Result<Vec<&'a Value>> {
    response
        .get(field)
        .and_then(Value::as_array)
        .and_then(|outer| outer.first())
        .and_then(Value::as_array)
        .map(|inner| inner.iter().collect())
        .ok_or_else(|| {
            RagError::VectorStore(format!("Query response missing '{}' results", field))
        })
}
