//! Product page scraping into the semantic store.

use std::sync::Arc;

use aisle_common::{AisleError, Result};
use aisle_memory::SemanticStore;
use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;

use crate::extract::DetailDocument;
use crate::fetch::PageFetcher;
use crate::rag::GroundedAnswerer;
use crate::tool::{CapabilityTool, InputKind, ToolContext};

pub const NAME: &str = "get_details";

/// Reply when the link is malformed or unreachable.
pub const CLARIFICATION: &str = "Please provide more information.";

/// Reply when the page lacks the expected product regions.
pub const UNREADABLE_PAGE: &str = "Sorry, I could not read the product details from that page.";

pub struct ProductDetail {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<SemanticStore>,
    answerer: Arc<GroundedAnswerer>,
}

impl ProductDetail {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<SemanticStore>,
        answerer: Arc<GroundedAnswerer>,
    ) -> Self {
        Self {
            fetcher,
            store,
            answerer,
        }
    }
}

/// Parse an absolute http(s) URL, tolerating quotes around it.
pub fn parse_link(input: &str) -> Result<Url> {
    let trimmed = input
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '<' | '>' | '`'));
    let url = Url::parse(trimmed)
        .map_err(|e| AisleError::InvalidInput(format!("not a URL: {e}")))?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
        Ok(url)
    } else {
        Err(AisleError::InvalidInput(format!(
            "unsupported link '{url}'"
        )))
    }
}

#[async_trait]
impl CapabilityTool for ProductDetail {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Find the product details about a specific product. The input is the link to \
         the product. You can get this link from the search results you got from the \
         function 'get_products'"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Url
    }

    fn return_direct(&self) -> bool {
        true
    }

    #[instrument(skip(self, ctx), fields(tool = NAME))]
    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String> {
        let url = match parse_link(input) {
            Ok(url) => url,
            Err(e) => {
                info!(error = %e, "Rejected product link");
                return Ok(CLARIFICATION.to_string());
            }
        };

        if !self.fetcher.probe(&url).await {
            info!(%url, "Product link unreachable");
            return Ok(CLARIFICATION.to_string());
        }

        let html = self.fetcher.fetch(&url).await?;
        let document = match DetailDocument::extract(&html) {
            Ok(doc) => doc,
            Err(AisleError::ExtractionFailure(reason)) => {
                warn!(%url, %reason, "Could not extract product details");
                return Ok(UNREADABLE_PAGE.to_string());
            }
            Err(e) => return Err(e),
        };

        match self.store.insert(&document.compose(), None).await {
            Ok(id) => info!(record_id = id, name = %document.name.trim(), "Indexed product page"),
            Err(e) => warn!(error = %e, "Product page not indexed"),
        }

        self.answerer.answer(&ctx.answer_prompt).await
    }
}
