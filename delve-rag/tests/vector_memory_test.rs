//! Vector memory store behaviour against counting embedder doubles

use async_trait::async_trait;
use delve_core::{DelveError, DelveResult, MemoryConfig, TextEmbedder};
use delve_rag::{HashingEmbedder, VectorMemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps the hashing embedder and counts embed calls
struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new(dimension: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbedder::new(dimension),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEmbedder for CountingEmbedder {
    async fn embed(&self, texts: &[String]) -> DelveResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

/// Returns a vector one component longer after the first call
struct ShiftingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl TextEmbedder for ShiftingEmbedder {
    async fn embed(&self, texts: &[String]) -> DelveResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let dimension = if call == 0 { 4 } else { 5 };
        Ok(texts.iter().map(|_| vec![0.5; dimension]).collect())
    }
}

/// Always fails, like an unreachable embedding endpoint
struct OfflineEmbedder;

#[async_trait]
impl TextEmbedder for OfflineEmbedder {
    async fn embed(&self, _texts: &[String]) -> DelveResult<Vec<Vec<f32>>> {
        Err(DelveError::Embedding {
            message: "endpoint unreachable".to_string(),
            provider: Some("offline".to_string()),
            context: delve_core::ErrorContext::new("offline_embedder"),
        })
    }
}

#[tokio::test]
async fn test_add_then_recall_returns_memory() {
    let mut store = VectorMemoryStore::new(CountingEmbedder::new(128), MemoryConfig::default());
    store.add_memory("User likes concise answers").await.unwrap();

    let recalled = store.recall("User likes concise answers", 1).await.unwrap();
    assert_eq!(recalled, vec!["User likes concise answers"]);
}

#[tokio::test]
async fn test_recall_ranks_closest_first() {
    let mut store = VectorMemoryStore::new(CountingEmbedder::new(256), MemoryConfig::default());
    for memory in [
        "User likes concise answers",
        "User prefers Python",
        "Meeting at 3pm tomorrow",
    ] {
        store.add_memory(memory).await.unwrap();
    }

    let recalled = store.recall_scored("Python", 3).await.unwrap();
    assert_eq!(recalled[0].text, "User prefers Python");
    assert!(recalled
        .windows(2)
        .all(|pair| pair[0].distance <= pair[1].distance));
}

#[tokio::test]
async fn test_recall_with_large_k_returns_all() {
    let mut store = VectorMemoryStore::new(CountingEmbedder::new(64), MemoryConfig::default());
    store.add_memory("first").await.unwrap();
    store.add_memory("second").await.unwrap();

    let mut recalled = store.recall("anything", 10).await.unwrap();
    recalled.sort();
    assert_eq!(recalled, vec!["first", "second"]);
}

#[tokio::test]
async fn test_recall_on_empty_store_skips_embedding() {
    let embedder = CountingEmbedder::new(64);
    let store = VectorMemoryStore::new(embedder.clone(), MemoryConfig::default());

    assert!(store.recall("anything", 3).await.unwrap().is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_dimension_mismatch_leaves_store_unchanged() {
    let embedder = Arc::new(ShiftingEmbedder {
        calls: AtomicUsize::new(0),
    });
    let mut store = VectorMemoryStore::new(embedder, MemoryConfig::default());

    store.add_memory("fits").await.unwrap();
    let err = store.add_memory("too long").await.unwrap_err();

    assert!(matches!(
        err,
        DelveError::DimensionMismatch {
            expected: 4,
            actual: 5,
            ..
        }
    ));
    assert!(err.is_structural());
    assert_eq!(store.len(), 1);
    assert_eq!(store.dimension(), Some(4));
}

#[tokio::test]
async fn test_embedding_failure_propagates() {
    let mut store = VectorMemoryStore::new(Arc::new(OfflineEmbedder), MemoryConfig::default());

    let err = store.add_memory("unreachable").await.unwrap_err();
    assert!(matches!(err, DelveError::Embedding { .. }));
    assert!(store.is_empty());
    assert_eq!(store.dimension(), None);
}

#[tokio::test]
async fn test_add_memories_batches_one_request() {
    let embedder = CountingEmbedder::new(64);
    let mut store = VectorMemoryStore::new(embedder.clone(), MemoryConfig::default());

    let added = store
        .add_memories(&["alpha".to_string(), "beta".to_string()])
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(embedder.calls(), 1);
    assert_eq!(store.memories().collect::<Vec<_>>(), vec!["alpha", "beta"]);
}
