//! Wiring adapters, tools and the dispatcher into one session.

use std::sync::Arc;

use aisle_common::{ConversationState, Result, Turn};
use aisle_llm::{build_completion_client, CompletionClient};
use aisle_memory::{build_embedder, SemanticStore};
use aisle_tools::{
    build_fetcher, DomainClassifier, GroundedAnswerer, PageFetcher, ProductDetail, ProductSearch,
    SearchProvider, SerpApiSearch, ToolRegistry,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{AssistantConfig, Credentials};
use crate::dispatcher::Dispatcher;

/// External services the assistant talks to.
#[derive(Clone)]
pub struct Adapters {
    pub completion: Arc<dyn CompletionClient>,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl Adapters {
    /// Production adapters for `config`, authenticated with `credentials`.
    pub fn from_config(config: &AssistantConfig, credentials: &Credentials) -> Result<Self> {
        let completion = build_completion_client(
            &config.completion,
            credentials.completion_key(config.completion.provider),
        )?;
        let search = Arc::new(SerpApiSearch::new(
            &config.search,
            credentials.serpapi_api_key.clone(),
        )?);
        let fetcher = build_fetcher(&config.fetch)?;
        Ok(Self {
            completion,
            search,
            fetcher,
        })
    }
}

/// Build the store with the configured embedder.
pub fn build_store(
    config: &AssistantConfig,
    credentials: &Credentials,
) -> Result<Arc<SemanticStore>> {
    let embedder = build_embedder(
        &config.embedding,
        credentials.embedding_key(config.embedding.provider),
    )?;
    Ok(Arc::new(SemanticStore::new(embedder)))
}

/// Register the three capability tools over `store`.
pub fn build_tools(
    config: &AssistantConfig,
    adapters: &Adapters,
    store: &Arc<SemanticStore>,
) -> Result<ToolRegistry> {
    let retailer = config.assistant.retailer.as_str();
    let classify = Arc::new(GroundedAnswerer::new(
        store.clone(),
        adapters.completion.clone(),
        &config.memory,
        config.completion.agent_temperature,
    ));
    let grounded = Arc::new(GroundedAnswerer::new(
        store.clone(),
        adapters.completion.clone(),
        &config.memory,
        config.completion.document_temperature,
    ));

    ToolRegistry::new()
        .with(Arc::new(DomainClassifier::new(classify, retailer)))?
        .with(Arc::new(ProductSearch::new(
            adapters.search.clone(),
            store.clone(),
            grounded.clone(),
            retailer,
        )))?
        .with(Arc::new(ProductDetail::new(
            adapters.fetcher.clone(),
            store.clone(),
            grounded,
        )))
}

/// A single conversation with the shop assistant.
pub struct Assistant {
    dispatcher: Dispatcher,
    store: Arc<SemanticStore>,
    state: Mutex<ConversationState>,
}

impl Assistant {
    /// Build production adapters and start an empty conversation over `store`.
    pub fn new(
        config: &AssistantConfig,
        credentials: &Credentials,
        store: Arc<SemanticStore>,
    ) -> Result<Self> {
        let adapters = Adapters::from_config(config, credentials)?;
        Self::with_adapters(config, adapters, store)
    }

    pub fn with_adapters(
        config: &AssistantConfig,
        adapters: Adapters,
        store: Arc<SemanticStore>,
    ) -> Result<Self> {
        let tools = build_tools(config, &adapters, &store)?;
        let dispatcher = Dispatcher::new(
            adapters.completion,
            Arc::new(tools),
            config.assistant.retailer.clone(),
            config.assistant.max_iterations,
            config.completion.agent_temperature,
        )?;

        info!(
            retailer = %config.assistant.retailer,
            tools = ?dispatcher.tools().names(),
            max_iterations = dispatcher.max_iterations(),
            "Assistant ready"
        );

        Ok(Self {
            dispatcher,
            store,
            state: Mutex::new(ConversationState::new()),
        })
    }

    /// Answer one query. Queries are handled one at a time.
    pub async fn run(&self, query: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        self.dispatcher.run(query, &mut state).await
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.state.lock().await.turns().to_vec()
    }

    pub async fn turns(&self) -> usize {
        self.state.lock().await.len()
    }

    pub fn store(&self) -> &Arc<SemanticStore> {
        &self.store
    }
}
