//! Conversation history for one assistant session.

use serde::{Deserialize, Serialize};

/// Who produced a line of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Assistant,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Assistant => "AI",
        }
    }
}

/// One completed exchange: the customer's query and the answer given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub response: String,

    /// Completion timestamp (Unix millis)
    pub timestamp: u64,
}

/// Ordered, append-only list of turns.
///
/// Turns cannot be removed or reordered; a fresh session starts a new
/// `ConversationState`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: impl Into<String>, response: impl Into<String>) {
        self.turns.push(Turn {
            query: query.into(),
            response: response.into(),
            timestamp: now_millis(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the history as `Human:`/`AI:` lines for prompt inclusion.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                format!(
                    "{}: {}\n{}: {}",
                    Speaker::Human.label(),
                    turn.query,
                    Speaker::Assistant.label(),
                    turn.response
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
