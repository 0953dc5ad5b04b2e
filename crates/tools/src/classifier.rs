//! Domain check: is this query about something the retailer sells?

use std::sync::Arc;

use aisle_common::Result;
use async_trait::async_trait;
use tracing::info;

use crate::rag::GroundedAnswerer;
use crate::tool::{CapabilityTool, InputKind, ToolContext};

pub const NAME: &str = "is_homedepot";

pub struct DomainClassifier {
    answerer: Arc<GroundedAnswerer>,
    retailer: String,
    description: String,
}

impl DomainClassifier {
    /// `answerer` should run at the agent temperature.
    pub fn new(answerer: Arc<GroundedAnswerer>, retailer: &str) -> Self {
        Self {
            answerer,
            retailer: retailer.to_string(),
            description: format!(
                "Use this tool if you are not sure the query is asking about a specific \
                 product available at {retailer}. Input is the query"
            ),
        }
    }

    pub fn question(&self, query: &str) -> String {
        format!(
            "Is the following asking about a product available at {}? {query}",
            self.retailer
        )
    }
}

#[async_trait]
impl CapabilityTool for DomainClassifier {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Query
    }

    fn return_direct(&self) -> bool {
        false
    }

    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String> {
        let query = match input.trim() {
            "" => ctx.query.as_str(),
            q => q,
        };
        let judgment = self.answerer.answer(&self.question(query)).await?;
        info!(tool = NAME, judgment_len = judgment.len(), "Classified query");
        Ok(judgment)
    }
}
