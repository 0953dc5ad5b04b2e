use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{apply_stop, Completion, CompletionClient, CompletionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.cohere.ai/v1";
pub const DEFAULT_MODEL: &str = "command";
const DEFAULT_MAX_TOKENS: u32 = 256;
const SERVICE: &str = "Cohere";

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Client for the Cohere generate endpoint.
pub struct CohereClient {
    base_url: String,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl CohereClient {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AisleError::Config(format!("Failed to build Cohere HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            api_key,
            http_client,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            stop_sequences: request.stop.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for CohereClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/generate", self.base_url.trim_end_matches('/'));
        let body = self.build_request_body(&request);

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending Cohere generate request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AisleError::unreachable(SERVICE, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AisleError::http_status(SERVICE, status.as_u16(), body_text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AisleError::unreachable(SERVICE, format!("failed to parse response: {e}"))
        })?;

        let generation = parsed
            .generations
            .into_iter()
            .next()
            .ok_or_else(|| AisleError::unreachable(SERVICE, "no generations in response"))?;

        Ok(Completion {
            text: apply_stop(&generation.text, &request.stop),
            model: self.model.clone(),
            finish_reason: generation.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
