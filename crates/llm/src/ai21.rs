use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{apply_stop, Completion, CompletionClient, CompletionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.ai21.com/studio/v1";
pub const DEFAULT_MODEL: &str = "j2-jumbo-instruct";
const DEFAULT_MAX_TOKENS: u32 = 256;
const SERVICE: &str = "AI21";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Ai21Request {
    prompt: String,
    num_results: u32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Deserialize)]
struct Ai21Response {
    completions: Vec<Ai21Completion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ai21Completion {
    data: Ai21CompletionData,
    finish_reason: Option<Ai21FinishReason>,
}

#[derive(Deserialize)]
struct Ai21CompletionData {
    text: String,
}

#[derive(Deserialize)]
struct Ai21FinishReason {
    reason: String,
}

/// Client for the AI21 Studio Jurassic completion endpoint.
pub struct Ai21Client {
    base_url: String,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl Ai21Client {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AisleError::Config(format!("Failed to build AI21 HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            api_key,
            http_client,
        })
    }

    fn build_request_body(request: &CompletionRequest) -> Ai21Request {
        Ai21Request {
            prompt: request.prompt.clone(),
            num_results: 1,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            stop_sequences: request.stop.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/complete",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CompletionClient for Ai21Client {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = Self::build_request_body(&request);

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            temperature = ?request.temperature,
            "Sending AI21 completion request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
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

        let parsed: Ai21Response = response.json().await.map_err(|e| {
            AisleError::unreachable(SERVICE, format!("failed to parse response: {e}"))
        })?;

        let first = parsed
            .completions
            .into_iter()
            .next()
            .ok_or_else(|| AisleError::unreachable(SERVICE, "no completions in response"))?;

        Ok(Completion {
            text: apply_stop(&first.data.text, &request.stop),
            model: self.model.clone(),
            finish_reason: first.finish_reason.map(|r| r.reason),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Ai21Client {
        Ai21Client::new(
            None,
            DEFAULT_MODEL.to_string(),
            "test-key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn request_body_matches_ai21_format() {
        let request = CompletionRequest::new("Question: hammers?")
            .with_temperature(0.5)
            .with_stop(["\nObservation:"]);

        let json = serde_json::to_value(Ai21Client::build_request_body(&request)).unwrap();

        assert_eq!(json["prompt"], "Question: hammers?");
        assert_eq!(json["numResults"], 1);
        assert_eq!(json["maxTokens"], 256);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["stopSequences"][0], "\nObservation:");
    }

    #[test]
    fn request_body_omits_unset_fields() {
        let json =
            serde_json::to_value(Ai21Client::build_request_body(&CompletionRequest::new("x")))
                .unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("stopSequences").is_none());
    }

    #[test]
    fn endpoint_includes_model() {
        assert_eq!(
            client().endpoint(),
            "https://api.ai21.com/studio/v1/j2-jumbo-instruct/complete"
        );
    }

    #[test]
    fn response_parses() {
        let raw = r#"{
            "id": "abc",
            "completions": [
                {"data": {"text": " Yes, it is.", "tokens": []},
                 "finishReason": {"reason": "endoftext"}}
            ]
        }"#;
        let parsed: Ai21Response = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.completions[0].data.text, " Yes, it is.");
        assert_eq!(
            parsed.completions[0]
                .finish_reason
                .as_ref()
                .map(|r| r.reason.as_str()),
            Some("endoftext")
        );
    }
}
