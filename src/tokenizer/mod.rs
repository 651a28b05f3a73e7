#[cfg(test)]
mod tests;

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::retry::{DEFAULT_RETRY_POLICY, RetryPolicy, request_with_retry};

const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
/// Conservative buffer added to the heuristic estimate so a chunk sized by
/// the fallback does not blow its budget once the real model tokenizes it.
const FALLBACK_TOKEN_BUFFER: usize = 10;

/// Token counting used to drive chunk boundaries.
///
/// Implementations never fail and never return 0: the count is used as a
/// budget unit downstream.
pub trait Tokenizer {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Counts tokens via a TEI-style remote tokenize endpoint, falling back to
/// [`HeuristicTokenizer`] when the service is unreachable or returns an
/// unrecognized shape.
#[derive(Debug, Clone)]
pub struct TeiTokenizer {
    endpoint: Url,
    agent: ureq::Agent,
    retry_policy: RetryPolicy,
    fallback: HeuristicTokenizer,
}

/// Offline token estimator: `max(word_count, char_count / 4) + 10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl TeiTokenizer {
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
            fallback: HeuristicTokenizer,
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

    fn remote_count(&self, text: &str) -> crate::Result<usize> {
        let request_json = json!({ "inputs": text }).to_string();

        let response_text = request_with_retry("tokenize", &self.retry_policy, || {
            self.agent
                .post(self.endpoint.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let value: Value =
            serde_json::from_str(&response_text).map_err(|e| crate::RagError::Transient(
                format!("tokenize: invalid JSON: {}", e),
            ))?;

        parse_tokenize_response(&value).ok_or_else(|| crate::RagError::UnparseableResponse {
            service: "tokenize".to_string(),
            detail: "unrecognized response shape".to_string(),
        })
    }
}

impl Tokenizer for TeiTokenizer {
    #[inline]
    fn count_tokens(&self, text: &str) -> usize {
        let clean_text = text.trim();
        if clean_text.is_empty() {
            return 1;
        }

        match self.remote_count(clean_text) {
            Ok(count) => count.max(1),
            Err(e) => {
                warn!("Tokenization failed (using fallback): {}", e);
                self.fallback.count_tokens(clean_text)
            }
        }
    }
}

impl Tokenizer for HeuristicTokenizer {
    #[inline]
    fn count_tokens(&self, text: &str) -> usize {
        let clean_text = text.trim();
        if clean_text.is_empty() {
            return 1;
        }

        let word_count = clean_text.split_whitespace().count();
        let char_estimate = clean_text.chars().count() / 4;
        word_count.max(char_estimate) + FALLBACK_TOKEN_BUFFER
    }
}

/// Decode the tokenize response, trying each known shape in priority order:
/// list-of-lists of token ids, list of token objects, or `{"input_ids": [...]}`.
fn parse_tokenize_response(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => {
                debug!("tokenize: list-of-lists response, {} ids", inner.len());
                Some(inner.len())
            }
            Some(Value::Object(_)) => {
                debug!("tokenize: list-of-objects response, {} tokens", items.len());
                Some(items.len())
            }
            _ => None,
        },
        Value::Object(map) => map
            .get("input_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.len()),
        _ => None,
    }
}
