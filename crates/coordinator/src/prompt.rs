//! Prompt templates for action selection and customer answers.

use aisle_common::ConversationState;
use aisle_tools::ToolRegistry;

/// Marker the model writes before a tool's result; generation stops here.
pub const OBSERVATION_MARKER: &str = "Observation:";

/// Stop sequence for action selection.
pub const STOP_SEQUENCE: &str = "\nObservation:";

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// How the assistant should treat a customer query.
pub fn guidelines(retailer: &str) -> String {
    format!(
        "If the query is not related to services or products offered by {retailer}, say you can't help.\n\
         If the query is asking about a specific product available at {retailer}, look for the product.\n\
         If the query is not about a specific product, offer the customer some general advice and suggest a few related {retailer} products.\n\
         If you don't know the answer, say you don't know and provide contact information for customer service."
    )
}

/// The customer query wrapped in shop-assistant instructions. Tools that
/// answer the customer directly retrieve and answer against this text.
pub fn answer_prompt(retailer: &str, query: &str) -> String {
    format!(
        "You are a helpful shop assistant at {retailer}. This is a query from a {retailer} customer: {query}\n\
         Answer the query following these guidelines:\n{guidelines}\n\
         In your answer:\n\
         Explain your answer briefly.\n\
         When you mention specific products, use full product names.\n\
         If you are asked about one specific product and you found the product, provide a link to that product.",
        guidelines = guidelines(retailer)
    )
}

/// One completed reasoning step: the model's text and what the tool said.
#[derive(Debug, Clone)]
pub struct ScratchpadEntry {
    pub log: String,
    pub observation: String,
}

/// Render the action-selection prompt.
pub fn action_prompt(
    retailer: &str,
    tools: &ToolRegistry,
    history: &ConversationState,
    query: &str,
    scratchpad: &[ScratchpadEntry],
) -> String {
    let tool_lines: Vec<String> = tools
        .iter()
        .map(|t| format!("{}: {}", t.name(), t.description()))
        .collect();
    let tool_names = tools.names().join(", ");

    let mut prompt = format!(
        "You are a helpful shop assistant at {retailer}. Answer the following questions as best you can. \
         You have access to the following tools:\n\n\
         {tools}\n\n\
         Use the following format:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{tool_names}]\n\
         Action Input: the input to the action\n\
         {OBSERVATION_MARKER} the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         {FINAL_ANSWER_MARKER} the final answer to the original input question\n\n\
         Begin!\n\n",
        tools = tool_lines.join("\n"),
    );

    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        prompt.push_str(&history.transcript());
        prompt.push_str("\n\n");
    }

    prompt.push_str("Question: ");
    prompt.push_str(query);
    prompt.push_str("\nThought:");
    for entry in scratchpad {
        prompt.push_str(&entry.log);
        prompt.push('\n');
        prompt.push_str(OBSERVATION_MARKER);
        prompt.push(' ');
        prompt.push_str(&entry.observation);
        prompt.push_str("\nThought:");
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisle_common::Result;
    use aisle_tools::{CapabilityTool, InputKind, ToolContext};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl CapabilityTool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            self.1
        }
        fn input_kind(&self) -> InputKind {
            InputKind::Query
        }
        fn return_direct(&self) -> bool {
            false
        }
        async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
            Ok(String::new())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(Named("is_homedepot", "Checks the domain")))
            .unwrap()
            .with(Arc::new(Named("get_products", "Searches products")))
            .unwrap()
    }

    #[test]
    fn answer_prompt_names_retailer_and_query() {
        let prompt = answer_prompt("Home Depot", "Do you sell drills?");
        assert!(prompt.starts_with(
            "You are a helpful shop assistant at Home Depot. This is a query from a Home Depot customer: Do you sell drills?"
        ));
        assert!(prompt.contains("say you can't help"));
        assert!(prompt.contains("provide a link to that product"));
    }

    #[test]
    fn action_prompt_lists_tools_in_order() {
        let prompt = action_prompt("Home Depot", &registry(), &ConversationState::new(), "q", &[]);
        assert!(prompt.contains("is_homedepot: Checks the domain\nget_products: Searches products"));
        assert!(prompt.contains("should be one of [is_homedepot, get_products]"));
        assert!(prompt.ends_with("Question: q\nThought:"));
        assert!(!prompt.contains("Previous conversation"));
    }

    #[test]
    fn action_prompt_includes_history_and_scratchpad() {
        let mut history = ConversationState::new();
        history.push("hi", "Hello! How can I help?");
        let scratchpad = vec![ScratchpadEntry {
            log: " I should check.\nAction: is_homedepot\nAction Input: paint".to_string(),
            observation: "Yes".to_string(),
        }];

        let prompt = action_prompt("Home Depot", &registry(), &history, "paint?", &scratchpad);
        assert!(prompt.contains("Previous conversation:\nHuman: hi\nAI: Hello! How can I help?\n\n"));
        assert!(prompt.ends_with(
            "Question: paint?\nThought: I should check.\nAction: is_homedepot\nAction Input: paint\nObservation: Yes\nThought:"
        ));
    }
}
