
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::{RagError, Result};

/// Backoff schedule shared by the tokenize and embed call sites.
pub const DEFAULT_RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    base_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(10),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy with no sleeps between attempts, for tests
    #[inline]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the retry following `attempt` (1-based): base * 2^(attempt-1), capped
    #[inline]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }
}

/// Run an HTTP request closure under the retry policy.
///
/// Server errors (5xx) and transport failures are retried; client errors
/// (4xx) and anything else fail immediately with `RagError::Rejected`.
/// Exhausting all attempts yields `RagError::Transient`.
pub fn request_with_retry<F>(operation: &str, policy: &RetryPolicy, mut request_fn: F) -> Result<String>
where
    F: FnMut() -> std::result::Result<String, ureq::Error>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        debug!(
            "{}: HTTP request attempt {}/{}",
            operation, attempt, policy.max_attempts
        );

        match request_fn() {
            Ok(response_text) => {
                debug!("{}: request succeeded on attempt {}", operation, attempt);
                return Ok(response_text);
            }
            Err(error) => {
                let should_retry = match &error {
                    ureq::Error::StatusCode(status) => {
                        if *status >= 500 {
                            warn!(
                                "{}: server error (status {}), attempt {}/{}",
                                operation, status, attempt, policy.max_attempts
                            );
                            true
                        } else {
                            warn!("{}: client error (status {}), not retrying", operation, status);
                            return Err(RagError::Rejected(format!(
                                "{}: HTTP {}",
                                operation, status
                            )));
                        }
                    }
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "{}: transport error: {}, attempt {}/{}",
                            operation, error, attempt, policy.max_attempts
                        );
                        true
                    }
                    _ => {
                        warn!("{}: non-retryable error: {}", operation, error);
                        false
                    }
                };

                if !should_retry {
                    return Err(RagError::Rejected(format!(
                        "{}: non-retryable error: {}",
                        operation, error
                    )));
                }

                last_error = Some(RagError::Transient(format!(
                    "{}: request error: {}",
                    operation, error
                )));

                if attempt < policy.max_attempts {
                    let delay = policy.delay_after(attempt);
                    if !delay.is_zero() {
                        debug!("{}: waiting {:?} before retry", operation, delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }

    error!("{}: all retry attempts failed", operation);

    Err(last_error.unwrap_or_else(|| {
        RagError::Transient(format!("{}: request failed after retries", operation))
    }))
}
