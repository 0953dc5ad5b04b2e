//! Parsing the model's action-selection output.

use std::sync::LazyLock;

use regex::Regex;

use crate::prompt::FINAL_ANSWER_MARKER;

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .expect("valid regex")
});
static ACTION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)").expect("valid regex"));

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    /// Call `tool` with `input`
    Action {
        tool: String,
        input: String,
        log: String,
    },
    /// Stop and answer
    Finish { answer: String, log: String },
}

/// Completion text that is neither an action nor a final answer. The
/// message is fed back to the model as the observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub log: String,
}

pub fn parse(text: &str) -> Result<AgentStep, ParseFailure> {
    let final_at = text.find(FINAL_ANSWER_MARKER);

    if let Some(caps) = ACTION.captures(text) {
        let starts_at = caps.get(0).map(|m| m.start()).unwrap_or_default();
        let before_final = final_at.map_or(true, |f| starts_at < f);
        if before_final {
            let tool = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let input = caps.get(2).map(|m| clean_input(m.as_str())).unwrap_or_default();
            if !tool.is_empty() {
                return Ok(AgentStep::Action {
                    tool: tool.to_string(),
                    input,
                    log: text.to_string(),
                });
            }
        }
    }

    if let Some(at) = final_at {
        let answer = text[at + FINAL_ANSWER_MARKER.len()..].trim().to_string();
        return Ok(AgentStep::Finish {
            answer,
            log: text.to_string(),
        });
    }

    let message = if ACTION_ONLY.is_match(text) {
        "Invalid format: Missing 'Action Input:' after 'Action:'"
    } else {
        "Invalid format: Missing 'Action:' after 'Thought:'"
    };
    Err(ParseFailure {
        message: message.to_string(),
        log: text.to_string(),
    })
}

/// The action input is the rest of its line, never past a final answer.
fn clean_input(raw: &str) -> String {
    let raw = raw.trim_start();
    let end = [raw.find('\n'), raw.find(FINAL_ANSWER_MARKER)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(raw.len());
    raw[..end].trim().trim_matches('"').trim().to_string()
}
