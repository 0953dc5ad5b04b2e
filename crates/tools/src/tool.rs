//! The capability tool abstraction and its registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use aisle_common::{AisleError, Result};
use async_trait::async_trait;

/// What a tool expects as its action input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The customer's query, verbatim
    Query,
    /// A short search keyword
    Keyword,
    /// An absolute http(s) URL
    Url,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Keyword => "keyword",
            Self::Url => "url",
        })
    }
}

/// Per-query context handed to every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The customer's original query
    pub query: String,

    /// The query wrapped in the shop-assistant answer instructions.
    /// Tools that answer the customer directly feed this to retrieval.
    pub answer_prompt: String,
}

impl ToolContext {
    pub fn new(query: impl Into<String>, answer_prompt: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer_prompt: answer_prompt.into(),
        }
    }
}

/// A named capability the dispatcher can invoke.
///
/// Recoverable problems with the input are answered as text; `Err` is
/// reserved for adapter failures the dispatcher reports as an observation.
#[async_trait]
pub trait CapabilityTool: Send + Sync {
    fn name(&self) -> &str;

    /// Shown to the completion model when it picks an action.
    fn description(&self) -> &str;

    fn input_kind(&self) -> InputKind;

    /// Whether the tool's output ends the turn as the final answer.
    fn return_direct(&self) -> bool;

    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String>;
}

/// Tools by name, fixed at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn CapabilityTool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn CapabilityTool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AisleError::Config(format!("Tool '{name}' registered twice")));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn with(mut self, tool: Arc<dyn CapabilityTool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CapabilityTool>> {
        self.tools.get(name)
    }

    /// Tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CapabilityTool>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
