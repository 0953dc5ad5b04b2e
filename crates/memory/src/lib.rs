//! Semantic memory for the shop assistant.
//!
//! A single append-only [`SemanticStore`] is shared by every capability
//! tool. Tools write what they learn (search results, product pages) and
//! read the nearest records back when composing an answer.
//!
//! ```text
//!   tool ──insert/insert_many──▶ Embedder ──▶ SemanticStore (RwLock<Vec>)
//!   tool ◀──────retrieve(k)───── cosine rank ◀──┘
//! ```

pub mod embedding;
pub mod retrieval;
pub mod similarity;
pub mod store;
pub mod types;

pub use embedding::{build_embedder, CohereEmbedder, Embedder, EmbeddingConfig, EmbeddingProvider};
pub use retrieval::{format_document, ContextBuilder};
pub use store::SemanticStore;
pub use types::{BatchReport, Document, MemoryConfig, Metadata, MetadataValue};
