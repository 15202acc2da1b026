//! Core trait definitions
//!
//! One trait per external collaborator. Components receive these as
//! `Arc<dyn Trait>` so tests can substitute doubles.

use crate::error::DelveResult;
use crate::types::*;
use async_trait::async_trait;

/// Language-model completion service
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return its text
    async fn complete(&self, request: CompletionRequest) -> DelveResult<String>;

    /// Short provider/model label for logs
    fn describe(&self) -> String {
        "chat-model".to_string()
    }
}

/// Web search provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, returning at most `max_results` hits in provider order
    async fn search(&self, query: &str, max_results: usize) -> DelveResult<Vec<WebHit>>;

    fn name(&self) -> &str;
}

/// Text embedding service
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed every text, one vector per input in the same order
    async fn embed(&self, texts: &[String]) -> DelveResult<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> DelveResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| crate::DelveError::Embedding {
            message: "Embedding service returned no vectors".to_string(),
            provider: None,
            context: crate::ErrorContext::new("embedder").with_operation("embed_one"),
        })
    }
}

/// Nearest-neighbor index over fixed-dimension vectors.
///
/// Positions are assigned in insertion order starting at 0.
pub trait VectorIndex: Send + Sync {
    /// Append a vector; its position is the previous `len()`
    fn add(&mut self, vector: &[f32]) -> DelveResult<()>;

    /// Return `(distances, positions)` of the `k` closest vectors, closest first
    fn search(&self, query: &[f32], k: usize) -> DelveResult<(Vec<f32>, Vec<usize>)>;

    /// Remove the vector at position 0, shifting every other position down by one
    fn remove_oldest(&mut self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;
}
