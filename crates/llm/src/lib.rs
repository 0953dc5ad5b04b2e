pub mod ai21;
pub mod client;
pub mod cohere;
pub mod config;
pub mod retry;

pub use ai21::Ai21Client;
pub use client::{apply_stop, Completion, CompletionClient, CompletionRequest};
pub use cohere::CohereClient;
pub use config::{build_completion_client, CompletionConfig, CompletionProvider, SemaphoredClient};
pub use retry::{RetryConfig, RetryingClient};
