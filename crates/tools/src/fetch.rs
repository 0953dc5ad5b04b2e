//! Product page fetching: reachability probe plus rendered HTML.

use std::sync::Arc;
use std::time::Duration;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (X11; CrOS x86_64 12871.102.0) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.141 Safari/537.36";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// True when the page answers a HEAD request with a success status.
    async fn probe(&self, url: &Url) -> bool;

    /// The page's HTML after it has been given time to render.
    async fn fetch(&self, url: &Url) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Headless Chrome driven over WebDriver
    #[default]
    WebDriver,
    /// Plain GET, no JavaScript
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub backend: FetchBackend,
    pub webdriver_url: String,
    pub headless: bool,
    /// Wait after navigation before reading the page source
    pub settle_delay_ms: u64,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            backend: FetchBackend::default(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            settle_delay_ms: 20_000,
            timeout_ms: 30_000,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn http_client(config: &FetchConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AisleError::Config(format!("Failed to build fetch client: {e}")))
}

async fn head_ok(client: &reqwest::Client, url: &Url) -> bool {
    match client.head(url.as_str()).send().await {
        Ok(response) => {
            let ok = response.status().is_success();
            debug!(%url, status = %response.status(), ok, "Probed page");
            ok
        }
        Err(e) => {
            debug!(%url, error = %e, "Page unreachable");
            false
        }
    }
}

/// Renders pages in a WebDriver-controlled browser. A new session is opened
/// per fetch and closed before returning.
pub struct WebDriverFetcher {
    webdriver_url: String,
    headless: bool,
    settle_delay: Duration,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl WebDriverFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            settle_delay: config.settle_delay(),
            timeout: config.timeout(),
            http_client: http_client(config)?,
        })
    }

    fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = vec!["--disable-gpu", "--no-sandbox"];
        if self.headless {
            args.push("--headless=new");
        }
        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }

    async fn render(&self, client: &fantoccini::Client, url: &Url) -> Result<String> {
        client
            .goto(url.as_str())
            .await
            .map_err(|e| AisleError::unreachable("WebDriver", format!("navigation failed: {e}")))?;
        tokio::time::sleep(self.settle_delay).await;
        client
            .source()
            .await
            .map_err(|e| {
                AisleError::unreachable("WebDriver", format!("page source unavailable: {e}"))
            })
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn probe(&self, url: &Url) -> bool {
        head_ok(&self.http_client, url).await
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        let connect = builder.connect(&self.webdriver_url);
        let client = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| AisleError::unreachable("WebDriver", "session request timed out"))?
            .map_err(|e| AisleError::unreachable("WebDriver", format!("session failed: {e}")))?;

        // Navigation and page source share one deadline on top of the settle delay.
        let deadline = self.timeout + self.settle_delay;
        let rendered = match tokio::time::timeout(deadline, self.render(&client, url)).await {
            Ok(rendered) => rendered,
            Err(_) => Err(AisleError::unreachable(
                "WebDriver",
                format!("page not rendered within {} ms", deadline.as_millis()),
            )),
        };

        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close WebDriver session");
        }

        let html = rendered?;
        info!(bytes = html.len(), "Rendered page");
        Ok(html)
    }
}

/// Fetches raw HTML without running scripts.
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            http_client: http_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn probe(&self, url: &Url) -> bool {
        head_ok(&self.http_client, url).await
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .http_client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AisleError::unreachable("page", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AisleError::http_status("page", status.as_u16(), url.to_string()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AisleError::unreachable("page", e.to_string()))?;
        info!(bytes = html.len(), "Fetched page");
        Ok(html)
    }
}

pub fn build_fetcher(config: &FetchConfig) -> Result<Arc<dyn PageFetcher>> {
    let fetcher: Arc<dyn PageFetcher> = match config.backend {
        FetchBackend::WebDriver => Arc::new(WebDriverFetcher::new(config)?),
        FetchBackend::Http => Arc::new(HttpFetcher::new(config)?),
    };
    info!(backend = ?config.backend, "Built page fetcher");
    Ok(fetcher)
}
