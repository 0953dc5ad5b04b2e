//! Rendering retrieved documents into prompt context.

use tracing::debug;

use crate::types::Document;

/// Renders retrieved documents under a rough token budget.
pub struct ContextBuilder {
    max_context_tokens: usize,
}

impl ContextBuilder {
    pub fn new(max_context_tokens: usize) -> Self {
        Self { max_context_tokens }
    }

    /// Render `documents` in rank order, separated by blank lines.
    ///
    /// Documents that would overflow the budget are dropped. The first
    /// document is always kept, truncated if it alone is too large.
    pub fn build(&self, documents: &[Document]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut token_count = 0;

        for doc in documents {
            let part = format_document(doc);
            let tokens = estimate_tokens(&part);

            if token_count + tokens > self.max_context_tokens {
                if parts.is_empty() {
                    parts.push(truncate(&part, self.max_context_tokens * 4));
                    token_count = self.max_context_tokens;
                }
                break;
            }
            parts.push(part);
            token_count += tokens;
        }

        debug!(
            documents = parts.len(),
            dropped = documents.len() - parts.len(),
            estimated_tokens = token_count,
            "Built retrieval context"
        );

        parts.join("\n\n")
    }
}

/// Document text followed by one `key: value` line per metadata field.
pub fn format_document(doc: &Document) -> String {
    let mut out = doc.text.clone();
    if let Some(metadata) = &doc.metadata {
        for (key, value) in metadata {
            out.push('\n');
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value.to_string());
        }
    }
    out
}

fn estimate_tokens(text: &str) -> usize {
    // ~4 chars per token
    text.len().div_ceil(4)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn doc(id: u64, text: &str) -> Document {
        Document {
            id,
            text: text.to_string(),
            metadata: None,
            score: 0.0,
        }
    }

    #[test]
    fn metadata_rendered_as_lines() {
        let mut metadata = Metadata::new();
        metadata.insert("price".into(), 99.0.into());
        metadata.insert("brand".into(), "DEWALT".into());
        let d = Document {
            metadata: Some(metadata),
            ..doc(0, "20V MAX Cordless Drill")
        };
        assert_eq!(
            format_document(&d),
            "20V MAX Cordless Drill\nbrand: DEWALT\nprice: 99"
        );
    }

    #[test]
    fn documents_joined_in_order() {
        let builder = ContextBuilder::new(1000);
        let context = builder.build(&[doc(0, "first"), doc(1, "second")]);
        assert_eq!(context, "first\n\nsecond");
    }

    #[test]
    fn budget_drops_trailing_documents() {
        let builder = ContextBuilder::new(3);
        let context = builder.build(&[doc(0, "abcdefgh"), doc(1, "ijklmnop")]);
        assert_eq!(context, "abcdefgh");
    }

    #[test]
    fn oversized_first_document_is_truncated() {
        let builder = ContextBuilder::new(1);
        let context = builder.build(&[doc(0, "abcdefgh")]);
        assert_eq!(context, "abcd...");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert!(ContextBuilder::new(10).build(&[]).is_empty());
    }
}
