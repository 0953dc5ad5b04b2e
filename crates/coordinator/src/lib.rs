//! The shop assistant's reasoning loop.
//!
//! A query goes through repeated action selection: the completion model
//! either picks a capability tool and its input, or gives a final answer.
//! Tools marked `return_direct` end the turn with their own output.
//!
//! ```text
//! query ─▶ Dispatcher ──prompt──▶ CompletionClient
//!              ▲    │
//!   observation│    ▼ Action / Final Answer
//!              └── ToolRegistry ──▶ SemanticStore
//! ```
//!
//! The loop is bounded by `assistant.max_iterations`; running out yields a
//! polite final answer rather than an error.

pub mod assistant;
pub mod config;
pub mod dispatcher;
pub mod parser;
pub mod prompt;

pub use assistant::{build_store, build_tools, Adapters, Assistant};
pub use config::{AssistantConfig, AssistantSettings, Credentials};
pub use dispatcher::{Dispatcher, BUDGET_EXCEEDED_REPLY, EMPTY_QUERY_REPLY};
pub use parser::{parse, AgentStep, ParseFailure};
