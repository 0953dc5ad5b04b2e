//! Common types shared across the Aisle crates.
//!
//! This crate holds the error taxonomy every adapter and tool reports through,
//! and the conversation history owned by an assistant session.

pub mod conversation;
pub mod error;

pub use conversation::{ConversationState, Speaker, Turn};
pub use error::{AisleError, Result};
