//! Catalog search that feeds the semantic store.

use std::sync::Arc;

use aisle_common::Result;
use aisle_memory::SemanticStore;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::flatten::ProductRecord;
use crate::rag::GroundedAnswerer;
use crate::search::SearchProvider;
use crate::tool::{CapabilityTool, InputKind, ToolContext};

pub const NAME: &str = "get_products";

pub struct ProductSearch {
    provider: Arc<dyn SearchProvider>,
    store: Arc<SemanticStore>,
    answerer: Arc<GroundedAnswerer>,
    description: String,
}

impl ProductSearch {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        store: Arc<SemanticStore>,
        answerer: Arc<GroundedAnswerer>,
        retailer: &str,
    ) -> Self {
        Self {
            provider,
            store,
            answerer,
            description: format!(
                "Look for the products on {retailer}'s website. Input is a string."
            ),
        }
    }

    /// Flatten and index the hits. Returns how many records landed.
    async fn index(
        &self,
        products: &[serde_json::Map<String, serde_json::Value>],
    ) -> Result<usize> {
        let mut titles = Vec::with_capacity(products.len());
        let mut metadatas = Vec::with_capacity(products.len());

        for (position, product) in products.iter().enumerate() {
            match ProductRecord::from_json(product) {
                Some(record) => {
                    titles.push(record.title);
                    metadatas.push(record.metadata);
                }
                None => warn!(position, "Skipping search hit without a title"),
            }
        }

        if titles.is_empty() {
            return Ok(0);
        }
        let report = self.store.insert_many(&titles, Some(metadatas)).await?;
        Ok(report.inserted.len())
    }
}

#[async_trait]
impl CapabilityTool for ProductSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Keyword
    }

    fn return_direct(&self) -> bool {
        true
    }

    #[instrument(skip(self, ctx), fields(tool = NAME))]
    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String> {
        let keyword = match input.trim() {
            "" => ctx.query.trim(),
            k => k,
        };

        match self.provider.search(keyword).await? {
            Some(products) => {
                let indexed = self.index(&products).await?;
                info!(hits = products.len(), indexed, "Indexed search results");
            }
            None => info!("Search returned no products, answering from store"),
        }

        self.answerer.answer(&ctx.answer_prompt).await
    }
}
