//! Retrieval-augmented answering over the semantic store.

use std::sync::Arc;

use aisle_common::Result;
use aisle_llm::{CompletionClient, CompletionRequest};
use aisle_memory::{ContextBuilder, MemoryConfig, SemanticStore};
use tracing::{debug, instrument};

/// Stuffs the nearest records into one prompt and asks the model.
pub struct GroundedAnswerer {
    store: Arc<SemanticStore>,
    client: Arc<dyn CompletionClient>,
    context: ContextBuilder,
    top_k: usize,
    temperature: f32,
}

impl GroundedAnswerer {
    pub fn new(
        store: Arc<SemanticStore>,
        client: Arc<dyn CompletionClient>,
        memory: &MemoryConfig,
        temperature: f32,
    ) -> Self {
        Self {
            store,
            client,
            context: ContextBuilder::new(memory.max_context_tokens),
            top_k: memory.top_k,
            temperature,
        }
    }

    pub fn store(&self) -> &Arc<SemanticStore> {
        &self.store
    }

    /// Answer `question` using the current store contents as context.
    #[instrument(skip(self, question), fields(question_len = question.len(), top_k = self.top_k))]
    pub async fn answer(&self, question: &str) -> Result<String> {
        let documents = self.store.retrieve(question, self.top_k).await?;
        let context = self.context.build(&documents);
        debug!(documents = documents.len(), "Answering from store");

        let request = CompletionRequest::new(stuff_prompt(&context, question))
            .with_temperature(self.temperature);
        let completion = self.client.complete(request).await?;
        Ok(completion.text.trim().to_string())
    }
}

/// The single-prompt "stuff" template.
pub fn stuff_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}
