//! End-to-end behaviour of the semantic store with a deterministic embedder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aisle_common::{AisleError, Result};
use aisle_memory::{ContextBuilder, Embedder, Metadata, SemanticStore};
use async_trait::async_trait;

const DIMENSIONS: usize = 64;

/// Hashed bag of lowercase words. Texts containing "unembeddable" fail.
#[derive(Default)]
struct BagOfWords {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for BagOfWords {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("unembeddable") {
            return Err(AisleError::EmbeddingUnavailable("rejected".into()));
        }
        let mut v = vec![0.0; DIMENSIONS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % DIMENSIONS] += 1.0;
        }
        Ok(v)
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

fn store() -> (Arc<BagOfWords>, SemanticStore) {
    let embedder = Arc::new(BagOfWords::default());
    let store = SemanticStore::new(embedder.clone());
    (embedder, store)
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_nearest_record_ranks_first() {
    let (_, store) = store();
    store.insert("cordless drill with battery", None).await.unwrap();
    store.insert("garden hose nozzle", None).await.unwrap();
    store.insert("interior wall paint", None).await.unwrap();

    let results = store.retrieve("cordless drill", 4).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].text, "cordless drill with battery");
    assert!(results[0].score >= results[1].score);
    assert!(results[1].score >= results[2].score);
}

#[tokio::test]
async fn test_retrieve_never_exceeds_k() {
    let (_, store) = store();
    for i in 0..10 {
        store.insert(&format!("drill model {i}"), None).await.unwrap();
    }
    assert_eq!(store.retrieve("drill", 4).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_empty_store_skips_embedder() {
    let (embedder, store) = store();
    let results = store.retrieve("anything", 4).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicates_are_kept() {
    let (_, store) = store();
    let mut orange = Metadata::new();
    orange.insert("color".into(), "orange".into());
    let mut black = Metadata::new();
    black.insert("color".into(), "black".into());

    store.insert("same text", Some(orange.clone())).await.unwrap();
    store.insert("same text", Some(black.clone())).await.unwrap();
    assert_eq!(store.len().await, 2);

    let results = store.retrieve("same text", 4).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].id < results[1].id);
    assert!(results.iter().all(|d| d.text == "same text"));
    assert_eq!(results[0].metadata, Some(orange));
    assert_eq!(results[1].metadata, Some(black));
}

#[tokio::test]
async fn test_batch_skips_failed_items() {
    let (_, store) = store();
    let mut first = Metadata::new();
    first.insert("price".into(), 99.0.into());
    let mut third = Metadata::new();
    third.insert("price".into(), 12.5.into());

    let report = store
        .insert_many(
            &texts(&["hammer", "unembeddable thing", "tape measure"]),
            Some(vec![first, Metadata::new(), third]),
        )
        .await
        .unwrap();

    assert_eq!(report.inserted.len(), 2);
    assert_eq!(report.skipped, vec![1]);
    assert!(!report.is_complete());

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].text, "tape measure");
    let price = snapshot[1].metadata.as_ref().unwrap()["price"].to_string();
    assert_eq!(price, "12.5");
}

#[tokio::test]
async fn test_retrieved_records_were_inserted() {
    let (_, store) = store();
    store
        .insert_many(&texts(&["saw", "unembeddable saw", "saw blade"]), None)
        .await
        .unwrap();

    let results = store.retrieve("saw", 10).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|d| !d.text.contains("unembeddable")));
}

#[tokio::test]
async fn test_concurrent_inserts_all_land() {
    let (_, store) = store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.insert(&format!("item {i}"), None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut ids: Vec<u64> = store.snapshot().await.iter().map(|d| d.id).collect();
    assert_eq!(ids.len(), 16);
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

#[tokio::test]
async fn test_context_renders_metadata() {
    let (_, store) = store();
    let mut metadata = Metadata::new();
    metadata.insert("brand".into(), "RIDGID".into());
    store.insert("wet dry vacuum", Some(metadata)).await.unwrap();

    let docs = store.retrieve("vacuum", 4).await.unwrap();
    let context = ContextBuilder::new(2048).build(&docs);
    assert_eq!(context, "wet dry vacuum\nbrand: RIDGID");
}
