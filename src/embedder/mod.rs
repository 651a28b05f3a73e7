
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::retry::{DEFAULT_RETRY_POLICY, RetryPolicy, request_with_retry};
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Capability to embed a batch of texts, returning one vector per input in
/// the same order.
pub trait EmbeddingProvider {
    fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Remote TEI-style embedding client.
#[derive(Debug, Clone)]
pub struct TeiEmbedder {
    endpoint: Url,
    agent: ureq::Agent,
    retry_policy: RetryPolicy,
}

impl TeiEmbedder {
    #[inline]
    pub fn new(endpoint: Url) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            endpoint,
            agent,
            retry_policy: DEFAULT_RETRY_POLICY,
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
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

impl EmbeddingProvider for TeiEmbedder {
    #[inline]
    fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request_json = json!({ "inputs": texts }).to_string();

        let response_text = request_with_retry("embed", &self.retry_policy, || {
            self.agent
                .post(self.endpoint.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let value: Value = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Transient(format!("embed: invalid JSON: {}", e)))?;

        let embeddings = parse_embedding_response(&value)?;

        if embeddings.len() != texts.len() {
            warn!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            );
        }

        Ok(embeddings)
    }
}

/// Decode the embed response, trying each known shape in priority order:
/// a flat numeric vector (single input, returned un-nested), a list of
/// vectors, or an object carrying them under `embeddings` or `data`.
fn parse_embedding_response(value: &Value) -> Result<Vec<Vec<f32>>> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Number(_)) => {
                debug!("embed: flat vector response, re-wrapping as single embedding");
                Ok(vec![parse_vector(value)?])
            }
            _ => items.iter().map(parse_vector).collect(),
        },
        Value::Object(map) => {
            let inner = map
                .get("embeddings")
                .or_else(|| map.get("data"))
                .and_then(Value::as_array)
                .ok_or_else(|| unparseable("object without embeddings or data field"))?;
            inner.iter().map(parse_vector).collect()
        }
        _ => Err(unparseable("expected array or object")),
    }
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| unparseable("expected a numeric vector"))?;

    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| unparseable("non-numeric vector element"))
        })
        .collect()
}

fn unparseable(detail: &str) -> RagError {
    RagError::UnparseableResponse {
        service: "embed".to_string(),
        detail: detail.to_string(),
    }
}
