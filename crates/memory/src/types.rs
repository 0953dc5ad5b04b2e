//! Record types and configuration for the semantic store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar attribute value.
///
/// The store's metadata is flat by construction: there is no list or map
/// variant, so nested structures must be flattened before insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Flat field name to scalar mapping attached to a record.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A record as returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned id, increasing in insertion order
    pub id: u64,

    /// The indexed text
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Cosine similarity to the query (1.0 = identical direction)
    #[serde(default)]
    pub score: f32,
}

/// Internal row: the document plus its vector.
#[derive(Debug, Clone)]
pub(crate) struct StoredRecord {
    pub id: u64,
    pub text: String,
    pub metadata: Option<Metadata>,
    pub embedding: Vec<f32>,
}

/// Outcome of a best-effort batch insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Ids of the records that were appended, in input order
    pub inserted: Vec<u64>,

    /// Input positions whose embedding could not be computed
    pub skipped: Vec<usize>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Documents fetched per retrieval-augmented answer
    pub top_k: usize,

    /// Rough budget for the rendered context (4 chars per token)
    pub max_context_tokens: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_context_tokens: 2048,
        }
    }
}
