use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{Completion, CompletionClient, CompletionRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retries transient completion failures with exponential backoff.
pub struct RetryingClient<T: CompletionClient> {
    inner: T,
    config: RetryConfig,
}

impl<T: CompletionClient> RetryingClient<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn parse_retry_after(error: &AisleError) -> Option<u64> {
        let AisleError::ServiceUnavailable { message, .. } = error else {
            return None;
        };
        let lower = message.to_ascii_lowercase();
        let pos = lower.find("retry-after")?;
        message[pos..]
            .split_whitespace()
            .skip(1)
            .find_map(|word| {
                word.trim_end_matches(|c: char| !c.is_ascii_digit())
                    .parse::<u64>()
                    .ok()
            })
            .map(|secs| secs * 1000)
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let jitter = (base * 0.1 * jitter_fraction(attempt)) as u64;
        (base as u64)
            .saturating_add(jitter)
            .min(self.config.max_delay_ms)
    }
}

/// Deterministic jitter in `[0, 1)` derived from the attempt number.
fn jitter_fraction(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

#[async_trait]
impl<T: CompletionClient> CompletionClient for RetryingClient<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(completion) => return Ok(completion),
                Err(e) if attempt < self.config.max_retries && e.is_transient() => {
                    let delay = Self::parse_retry_after(&e)
                        .unwrap_or_else(|| self.compute_delay(attempt))
                        .min(self.config.max_delay_ms);

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        model = %self.inner.model_name(),
                        error = %e,
                        "Retrying completion request"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
