//! Product search providers.

use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";
pub const SERPAPI_ENGINE: &str = "home_depot";

const SERVICE: &str = "SerpApi";

/// Raw product objects in provider order. `None` when the response carried
/// no `products` field at all.
pub type SearchHits = Option<Vec<Map<String, Value>>>;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<SearchHits>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_url: String,
    pub engine: String,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: SERPAPI_URL.to_string(),
            engine: SERPAPI_ENGINE.to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// SerpApi client for the retailer search engine.
pub struct SerpApiSearch {
    api_url: String,
    engine: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl SerpApiSearch {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AisleError::Config(format!("Failed to build search client: {e}")))?;
        Ok(Self {
            api_url: config.api_url.clone(),
            engine: config.engine.clone(),
            api_key,
            http_client,
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    #[instrument(skip(self), fields(engine = %self.engine))]
    async fn search(&self, keyword: &str) -> Result<SearchHits> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", keyword),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AisleError::unreachable(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AisleError::http_status(SERVICE, status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AisleError::unreachable(SERVICE, format!("invalid response body: {e}")))?;

        let hits = products_of(body);
        debug!(hits = hits.as_ref().map(Vec::len), "Search finished");
        Ok(hits)
    }
}

/// Pull the `products` array out of a search response.
pub fn products_of(mut body: Value) -> SearchHits {
    let products = body.get_mut("products")?.take();
    match products {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    other => {
                        warn!(value = %other, "Ignoring non-object search hit");
                        None
                    }
                })
                .collect(),
        ),
        Value::Null => None,
        other => {
            warn!(value = %other, "Unexpected products field");
            None
        }
    }
}
