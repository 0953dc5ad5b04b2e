//! The bounded action-selection loop.

use std::sync::Arc;

use aisle_common::{AisleError, ConversationState, Result};
use aisle_llm::{apply_stop, CompletionClient, CompletionRequest};
use aisle_tools::{ToolContext, ToolRegistry};
use tracing::{debug, info, instrument, warn};

use crate::parser::{parse, AgentStep};
use crate::prompt::{action_prompt, answer_prompt, ScratchpadEntry, STOP_SEQUENCE};

/// Reply to a blank query. Not recorded in the conversation.
pub const EMPTY_QUERY_REPLY: &str = "Could you tell me what you are looking for?";

/// Final answer when the step budget runs out.
pub const BUDGET_EXCEEDED_REPLY: &str =
    "Sorry, I could not work out an answer to that. Could you rephrase your question?";

/// Drives one query at a time through the tools.
pub struct Dispatcher {
    client: Arc<dyn CompletionClient>,
    tools: Arc<ToolRegistry>,
    retailer: String,
    max_iterations: usize,
    temperature: f32,
}

impl Dispatcher {
    /// `max_iterations` must be at least 1.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        tools: Arc<ToolRegistry>,
        retailer: impl Into<String>,
        max_iterations: usize,
        temperature: f32,
    ) -> Result<Self> {
        if max_iterations == 0 {
            return Err(AisleError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            client,
            tools,
            retailer: retailer.into(),
            max_iterations,
            temperature,
        })
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answer `query` and record the turn in `state`.
    ///
    /// Tool failures and malformed completions become observations. Only a
    /// failed action-selection completion is returned as an error, in which
    /// case `state` is left untouched.
    #[instrument(skip(self, query, state), fields(query_len = query.len(), history = state.len()))]
    pub async fn run(&self, query: &str, state: &mut ConversationState) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query");
            return Ok(EMPTY_QUERY_REPLY.to_string());
        }

        let ctx = ToolContext::new(query, answer_prompt(&self.retailer, query));
        let answer = self.select_until_done(&ctx, state).await?;

        state.push(query, answer.clone());
        info!(turns = state.len(), answer_len = answer.len(), "Turn complete");
        Ok(answer)
    }

    async fn select_until_done(
        &self,
        ctx: &ToolContext,
        state: &ConversationState,
    ) -> Result<String> {
        let mut scratchpad: Vec<ScratchpadEntry> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = action_prompt(&self.retailer, &self.tools, state, &ctx.query, &scratchpad);
            let request = CompletionRequest::new(prompt)
                .with_temperature(self.temperature)
                .with_stop([STOP_SEQUENCE]);
            let completion = self.client.complete(request).await?;
            let text = apply_stop(&completion.text, &[STOP_SEQUENCE.to_string()]);

            let (log, observation) = match parse(&text) {
                Ok(AgentStep::Finish { answer, .. }) => {
                    info!(iteration, "Final answer selected");
                    return Ok(answer);
                }
                Ok(AgentStep::Action { tool, input, log }) => {
                    debug!(iteration, %tool, input = %input, "Action selected");
                    match self.tools.get(&tool) {
                        None => {
                            warn!(iteration, %tool, "Unknown tool requested");
                            (log, format!("{tool} is not a valid tool, try another one."))
                        }
                        Some(handler) => match handler.execute(&input, ctx).await {
                            Ok(output) if handler.return_direct() => {
                                info!(iteration, %tool, "Tool answered directly");
                                return Ok(output);
                            }
                            Ok(output) => (log, output),
                            Err(e) => {
                                warn!(iteration, %tool, error = %e, "Tool failed");
                                (log, format!("{tool} failed: {e}"))
                            }
                        },
                    }
                }
                Err(failure) => {
                    warn!(iteration, "Unparseable action selection");
                    (failure.log, failure.message)
                }
            };

            debug!(iteration, observation_len = observation.len(), "Observation recorded");
            scratchpad.push(ScratchpadEntry { log, observation });
        }

        let exhausted = AisleError::IterationBudgetExceeded(self.max_iterations);
        warn!(error = %exhausted, "Giving up on query");
        Ok(BUDGET_EXCEEDED_REPLY.to_string())
    }
}
