//! Capability tools for the shop assistant.
//!
//! Three tools are exposed to the dispatcher:
//!
//! | Name | Input | Ends the turn |
//! |------|-------|---------------|
//! | `is_homedepot` | the query | no |
//! | `get_products` | search keyword | yes |
//! | `get_details` | product page URL | yes |
//!
//! Search and detail tools write what they find into the shared
//! [`SemanticStore`](aisle_memory::SemanticStore) and answer from it.

pub mod classifier;
pub mod extract;
pub mod fetch;
pub mod flatten;
pub mod product_detail;
pub mod product_search;
pub mod rag;
pub mod search;
pub mod tool;

pub use classifier::DomainClassifier;
pub use extract::DetailDocument;
pub use fetch::{
    build_fetcher, FetchBackend, FetchConfig, HttpFetcher, PageFetcher, WebDriverFetcher,
};
pub use flatten::ProductRecord;
pub use product_detail::ProductDetail;
pub use product_search::ProductSearch;
pub use rag::GroundedAnswerer;
pub use search::{SearchConfig, SearchHits, SearchProvider, SerpApiSearch};
pub use tool::{CapabilityTool, InputKind, ToolContext, ToolRegistry};
