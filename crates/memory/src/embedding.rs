//! Embedding adapters for the semantic store.
//!
//! The store only sees the [`Embedder`] trait. Two adapters ship with the
//! crate: the Cohere embed endpoint (default) and, behind the
//! `local-embeddings` feature, an in-process fastembed model.

use std::sync::Arc;
use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub const COHERE_BASE_URL: &str = "https://api.cohere.ai/v1";
pub const COHERE_MODEL: &str = "embed-english-v2.0";

/// Turns text into a fixed-length vector.
///
/// Implementations report every failure as
/// [`AisleError::EmbeddingUnavailable`].
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Cohere,
    /// In-process model, requires the `local-embeddings` feature
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: None,
            api_url: None,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: [&'a str; 1],
    model: &'a str,
    truncate: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere `/embed` client.
pub struct CohereEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl CohereEmbedder {
    pub fn new(
        base_url: Option<String>,
        model: Option<String>,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AisleError::Config(format!("Failed to build embedding client: {e}")))?;
        Ok(Self {
            base_url: base_url.unwrap_or_else(|| COHERE_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| COHERE_MODEL.to_string()),
            api_key,
            http_client,
        })
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let body = EmbedRequest {
            texts: [text],
            model: &self.model,
            truncate: "END",
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AisleError::EmbeddingUnavailable(format!("Cohere request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AisleError::EmbeddingUnavailable(format!(
                "Cohere embed error {status}: {body_text}"
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            AisleError::EmbeddingUnavailable(format!("Failed to parse Cohere embeddings: {e}"))
        })?;

        let embedding = parsed
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AisleError::EmbeddingUnavailable("Empty embedding result".into()))?;

        debug!(dimension = embedding.len(), "Generated embedding");
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use std::sync::Arc;

    use aisle_common::{AisleError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use once_cell::sync::OnceCell;
    use tokio::task;
    use tracing::{debug, info};

    use super::Embedder;

    /// fastembed-backed embedder; the model loads on first use.
    pub struct FastEmbedder {
        label: String,
        model_name: EmbeddingModel,
        model: OnceCell<Arc<TextEmbedding>>,
    }

    impl FastEmbedder {
        pub fn from_model_str(name: &str) -> Result<Self> {
            let model_name = match name {
                "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
                "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
                "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
                "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
                "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
                other => {
                    return Err(AisleError::Config(format!(
                        "Unknown local embedding model: '{other}'"
                    )))
                }
            };
            Ok(Self {
                label: name.to_string(),
                model_name,
                model: OnceCell::new(),
            })
        }

        fn get_or_init_model(&self) -> Result<Arc<TextEmbedding>> {
            self.model
                .get_or_try_init(|| {
                    info!(model = %self.label, "Initializing local embedding model");
                    let options = InitOptions::new(self.model_name.clone())
                        .with_show_download_progress(false);
                    TextEmbedding::try_new(options)
                        .map(Arc::new)
                        .map_err(|e| AisleError::EmbeddingUnavailable(e.to_string()))
                })
                .cloned()
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let model = self.get_or_init_model()?;
            let text = text.to_string();

            let embeddings = task::spawn_blocking(move || model.embed(vec![text], None))
                .await
                .map_err(|e| {
                    AisleError::EmbeddingUnavailable(format!("Blocking task failed: {e}"))
                })?
                .map_err(|e| AisleError::EmbeddingUnavailable(e.to_string()))?;

            let embedding = embeddings
                .into_iter()
                .next()
                .ok_or_else(|| AisleError::EmbeddingUnavailable("Empty embedding result".into()))?;
            debug!(dimension = embedding.len(), "Generated local embedding");
            Ok(embedding)
        }

        fn model_name(&self) -> &str {
            &self.label
        }
    }
}

/// Build the configured embedder. `cohere_api_key` is ignored by local models.
pub fn build_embedder(config: &EmbeddingConfig, cohere_api_key: &str) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::Cohere => {
            if cohere_api_key.trim().is_empty() {
                return Err(AisleError::Config(
                    "Cohere embeddings require an API key".to_string(),
                ));
            }
            Arc::new(CohereEmbedder::new(
                config.api_url.clone(),
                config.model.clone(),
                cohere_api_key.to_string(),
                Duration::from_millis(config.timeout_ms),
            )?)
        }
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Arc::new(FastEmbedder::from_model_str(
            config.model.as_deref().unwrap_or("all-MiniLM-L6-v2"),
        )?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => {
            return Err(AisleError::Config(
                "Local embeddings need the `local-embeddings` feature".to_string(),
            ))
        }
    };

    info!(provider = ?config.provider, model = %embedder.model_name(), "Built embedder");
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_cohere_format() {
        let body = EmbedRequest {
            texts: ["DEWALT 20V cordless drill"],
            model: COHERE_MODEL,
            truncate: "END",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["texts"][0], "DEWALT 20V cordless drill");
        assert_eq!(json["model"], "embed-english-v2.0");
        assert_eq!(json["truncate"], "END");
    }

    #[test]
    fn build_cohere_embedder() {
        let embedder = build_embedder(&EmbeddingConfig::default(), "key").unwrap();
        assert_eq!(embedder.model_name(), "embed-english-v2.0");
    }

    #[test]
    fn cohere_without_key_fails() {
        assert!(build_embedder(&EmbeddingConfig::default(), "").is_err());
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn local_without_feature_fails() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Local,
            ..Default::default()
        };
        assert!(build_embedder(&config, "").is_err());
    }

    #[tokio::test]
    async fn unreachable_service_is_embedding_unavailable() {
        let embedder = CohereEmbedder::new(
            Some("http://127.0.0.1:9".to_string()),
            None,
            "key".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, AisleError::EmbeddingUnavailable(_)));
    }
}
