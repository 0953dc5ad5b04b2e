use std::sync::Arc;
use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai21::{self, Ai21Client};
use crate::client::{Completion, CompletionClient, CompletionRequest};
use crate::cohere::{self, CohereClient};
use crate::retry::{RetryConfig, RetryingClient};

/// Which completion service backs the assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    #[default]
    Ai21,
    Cohere,
}

impl CompletionProvider {
    fn default_model(self) -> &'static str {
        match self {
            Self::Ai21 => ai21::DEFAULT_MODEL,
            Self::Cohere => cohere::DEFAULT_MODEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: CompletionProvider,
    /// Provider default when unset
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub max_tokens: Option<u32>,
    /// Temperature for action selection and domain classification
    pub agent_temperature: f32,
    /// Temperature for answers grounded on stored documents
    pub document_temperature: f32,
    pub timeout_ms: u64,
    pub max_concurrent_requests: usize,
    pub retry: RetryConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::default(),
            model: None,
            api_url: None,
            max_tokens: None,
            agent_temperature: 0.5,
            document_temperature: 0.1,
            timeout_ms: 60_000,
            max_concurrent_requests: 2,
            retry: RetryConfig::default(),
        }
    }
}

impl CompletionConfig {
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Bounds the number of in-flight requests to one client.
pub struct SemaphoredClient {
    inner: Arc<dyn CompletionClient>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn CompletionClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl CompletionClient for SemaphoredClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let _permit = self.semaphore.acquire().await.map_err(|e| {
            AisleError::unreachable(self.inner.model_name(), format!("semaphore closed: {e}"))
        })?;
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Build a retrying, concurrency-bounded client for the configured provider.
pub fn build_completion_client(
    config: &CompletionConfig,
    api_key: &str,
) -> Result<Arc<dyn CompletionClient>> {
    if api_key.trim().is_empty() {
        return Err(AisleError::Config(format!(
            "{:?} completion provider requires an API key",
            config.provider
        )));
    }

    let model = config.model_name().to_string();
    let base_client: Box<dyn CompletionClient> = match config.provider {
        CompletionProvider::Ai21 => Box::new(Ai21Client::new(
            config.api_url.clone(),
            model,
            api_key.to_string(),
            config.timeout(),
        )?),
        CompletionProvider::Cohere => Box::new(CohereClient::new(
            config.api_url.clone(),
            model,
            api_key.to_string(),
            config.timeout(),
        )?),
    };

    info!(
        provider = ?config.provider,
        model = %base_client.model_name(),
        max_retries = config.retry.max_retries,
        "Built completion client"
    );

    let retrying: Box<dyn CompletionClient> =
        Box::new(RetryingClient::new(base_client, config.retry.clone()));

    Ok(Arc::new(SemaphoredClient::new(
        Arc::from(retrying),
        config.max_concurrent_requests,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
provider = "cohere"
model = "command-light"
max_concurrent_requests = 4
agent_temperature = 0.3

[retry]
max_retries = 5
initial_delay_ms = 1000
"#;

    #[test]
    fn deserialize_config_from_toml() {
        let config: CompletionConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.provider, CompletionProvider::Cohere);
        assert_eq!(config.model_name(), "command-light");
        assert_eq!(config.max_concurrent_requests, 4);
        assert!((config.agent_temperature - 0.3).abs() < f32::EPSILON);
        assert!((config.document_temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: CompletionConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider, CompletionProvider::Ai21);
        assert_eq!(config.model_name(), "j2-jumbo-instruct");
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn build_ai21_client() {
        let client = build_completion_client(&CompletionConfig::default(), "key").unwrap();
        assert_eq!(client.model_name(), "j2-jumbo-instruct");
    }

    #[test]
    fn build_cohere_client() {
        let config = CompletionConfig {
            provider: CompletionProvider::Cohere,
            ..Default::default()
        };
        let client = build_completion_client(&config, "key").unwrap();
        assert_eq!(client.model_name(), "command");
    }

    #[test]
    fn build_without_key_fails() {
        assert!(build_completion_client(&CompletionConfig::default(), "  ").is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result: std::result::Result<CompletionConfig, _> =
            toml::from_str(r#"provider = "gemini""#);
        assert!(result.is_err());
    }

    /// Tracks how many calls overlap.
    #[derive(Default)]
    struct InFlight {
        gauge: std::sync::Mutex<(usize, usize)>,
    }

    #[async_trait]
    impl CompletionClient for InFlight {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            {
                let mut g = self.gauge.lock().unwrap();
                g.0 += 1;
                g.1 = g.1.max(g.0);
            }
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.gauge.lock().unwrap().0 -= 1;
            Ok(Completion {
                text: request.prompt,
                model: "gauge".to_string(),
                finish_reason: None,
            })
        }
        fn model_name(&self) -> &str {
            "gauge"
        }
    }

    #[tokio::test]
    async fn semaphore_caps_overlapping_requests() {
        let inner = Arc::new(InFlight::default());
        let client = Arc::new(SemaphoredClient::new(inner.clone(), 2));

        let calls = (0..5).map(|i| {
            let client = client.clone();
            async move { client.complete(CompletionRequest::new(format!("q{i}"))).await }
        });
        for outcome in futures_join(calls).await {
            assert!(outcome.unwrap().text.starts_with('q'));
        }

        let peak = inner.gauge.lock().unwrap().1;
        assert!((1..=2).contains(&peak), "peak concurrency {peak}");
    }

    async fn futures_join<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = futures.map(tokio::spawn).collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }
}
