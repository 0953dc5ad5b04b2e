//! Append-only in-process vector store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aisle_common::{AisleError, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::similarity::cosine_similarity;
use crate::types::{BatchReport, Document, Metadata, StoredRecord};

/// The semantic memory shared by every capability tool.
///
/// Records are only ever appended. Embeddings are computed before the write
/// lock is taken, so a slow embedding call never blocks readers.
pub struct SemanticStore {
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<StoredRecord>>,
    next_id: AtomicU64,
}

impl SemanticStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        info!(model = %embedder.model_name(), "Initializing semantic store");
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Embed `text` and append it. Nothing is appended if embedding fails.
    pub async fn insert(&self, text: &str, metadata: Option<Metadata>) -> Result<u64> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(as_embedding_error)?;

        let mut records = self.records.write().await;
        if let Some(dimension) = records.first().map(|r| r.embedding.len()) {
            if dimension != embedding.len() {
                return Err(AisleError::EmbeddingUnavailable(format!(
                    "embedding has {} dimensions, store holds {dimension}",
                    embedding.len()
                )));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        records.push(StoredRecord {
            id,
            text: text.to_string(),
            metadata,
            embedding,
        });

        debug!(
            record_id = id,
            text_len = text.len(),
            total = records.len(),
            "Inserted record"
        );
        Ok(id)
    }

    /// Insert each text with its parallel metadata, skipping failures.
    ///
    /// Items already inserted stay when a later item fails. A `metadatas`
    /// sequence whose length differs from `texts` is rejected up front.
    pub async fn insert_many(
        &self,
        texts: &[String],
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<BatchReport> {
        if let Some(ref m) = metadatas {
            if m.len() != texts.len() {
                return Err(AisleError::InvalidInput(format!(
                    "{} texts but {} metadata entries",
                    texts.len(),
                    m.len()
                )));
            }
        }

        let mut metadatas = metadatas.map(Vec::into_iter);
        let mut report = BatchReport::default();

        for (index, text) in texts.iter().enumerate() {
            let metadata = metadatas.as_mut().and_then(Iterator::next);
            match self.insert(text, metadata).await {
                Ok(id) => report.inserted.push(id),
                Err(e) => {
                    warn!(index, error = %e, "Skipping record, embedding failed");
                    report.skipped.push(index);
                }
            }
        }

        info!(
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            "Batch insert finished"
        );
        Ok(report)
    }

    /// Return up to `k` records ranked nearest-first.
    ///
    /// An empty store (or `k == 0`) yields an empty result without touching
    /// the embedder.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(as_embedding_error)?;

        let records = self.records.read().await;
        if let Some(dimension) = records.first().map(|r| r.embedding.len()) {
            if dimension != query_embedding.len() {
                return Err(AisleError::EmbeddingUnavailable(format!(
                    "query embedding has {} dimensions, store holds {dimension}",
                    query_embedding.len()
                )));
            }
        }

        let mut scored: Vec<(f32, &StoredRecord)> = records
            .iter()
            .map(|r| (cosine_similarity(&query_embedding, &r.embedding), r))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(
            k,
            returned = scored.len(),
            best_score = scored.first().map(|(s, _)| *s),
            "Retrieved records"
        );

        Ok(scored
            .into_iter()
            .map(|(score, r)| Document {
                id: r.id,
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                score,
            })
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every record in insertion order, without scores.
    pub async fn snapshot(&self) -> Vec<Document> {
        self.records
            .read()
            .await
            .iter()
            .map(|r| Document {
                id: r.id,
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                score: 0.0,
            })
            .collect()
    }
}

fn as_embedding_error(e: AisleError) -> AisleError {
    match e {
        AisleError::EmbeddingUnavailable(_) => e,
        other => AisleError::EmbeddingUnavailable(other.to_string()),
    }
}
