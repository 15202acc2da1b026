//! Long-term semantic memory backed by a nearest-neighbor index

use crate::index::FlatL2Index;
use delve_core::{
    CapacityPolicy, DelveError, DelveResult, ErrorContext, MemoryConfig, TextEmbedder,
    VectorIndex,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds an index for a given dimension on the first insert
pub type IndexFactory = Box<dyn Fn(usize) -> Box<dyn VectorIndex> + Send + Sync>;

/// A recalled memory with its index position and squared L2 distance to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalledMemory {
    pub position: usize,
    pub text: String,
    pub distance: f32,
}

/// Lifecycle of the index: no dimension until the first memory arrives
enum IndexState {
    Uninitialized,
    Active {
        dimension: usize,
        index: Box<dyn VectorIndex>,
    },
}

/// Vector memory store.
///
/// Position `i` in the index always holds the embedding of `memories[i]`.
/// Inserts append; with `CapacityPolicy::EvictOldest` the oldest memory is
/// dropped from both sides at once so the pairing survives eviction.
pub struct VectorMemoryStore {
    embedder: Arc<dyn TextEmbedder>,
    config: MemoryConfig,
    index_factory: IndexFactory,
    state: IndexState,
    memories: VecDeque<String>,
}

impl VectorMemoryStore {
    /// Create an empty store using an exact flat L2 index
    pub fn new(embedder: Arc<dyn TextEmbedder>, config: MemoryConfig) -> Self {
        Self {
            embedder,
            config,
            index_factory: Box::new(|dimension| Box::new(FlatL2Index::new(dimension))),
            state: IndexState::Uninitialized,
            memories: VecDeque::new(),
        }
    }

    /// Use a different index implementation
    pub fn with_index_factory(mut self, factory: IndexFactory) -> Self {
        self.index_factory = factory;
        self
    }

    /// Embed `text` and append it to the store
    pub async fn add_memory(&mut self, text: &str) -> DelveResult<()> {
        if text.trim().is_empty() {
            return Err(DelveError::InvalidArgument {
                message: "Memory text must not be empty".to_string(),
                field: Some("text".to_string()),
                context: ErrorContext::new("vector_memory").with_operation("add_memory"),
            });
        }

        let embedding = self.embedder.embed_one(text).await?;
        self.insert(text.to_string(), embedding)
    }

    /// Embed several texts in one request and append them in order.
    ///
    /// Stops at the first rejected memory; earlier ones stay stored.
    pub async fn add_memories(&mut self, texts: &[String]) -> DelveResult<usize> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(DelveError::InvalidArgument {
                message: "Memory text must not be empty".to_string(),
                field: Some("texts".to_string()),
                context: ErrorContext::new("vector_memory").with_operation("add_memories"),
            });
        }

        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(DelveError::Embedding {
                message: format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                ),
                provider: None,
                context: ErrorContext::new("vector_memory").with_operation("add_memories"),
            });
        }

        for (text, embedding) in texts.iter().zip(embeddings) {
            self.insert(text.clone(), embedding)?;
        }

        Ok(texts.len())
    }

    fn insert(&mut self, text: String, embedding: Vec<f32>) -> DelveResult<()> {
        if embedding.is_empty() {
            return Err(DelveError::Embedding {
                message: "Embedding service returned an empty vector".to_string(),
                provider: None,
                context: ErrorContext::new("vector_memory").with_operation("insert"),
            });
        }

        if let IndexState::Active { dimension, .. } = &self.state {
            if embedding.len() != *dimension {
                return Err(DelveError::DimensionMismatch {
                    expected: *dimension,
                    actual: embedding.len(),
                    context: ErrorContext::new("vector_memory")
                        .with_operation("add_memory")
                        .with_suggestion("Use the same embedding model for every memory"),
                });
            }
        }

        if let Some(capacity) = self.config.max_memories {
            if self.memories.len() >= capacity {
                match self.config.on_full {
                    CapacityPolicy::Reject => {
                        return Err(DelveError::CapacityExceeded {
                            capacity,
                            context: ErrorContext::new("vector_memory")
                                .with_operation("add_memory")
                                .with_suggestion("Raise memory.max_memories")
                                .with_suggestion("Use on_full = \"evict_oldest\""),
                        });
                    }
                    CapacityPolicy::EvictOldest => self.evict_oldest(),
                }
            }
        }

        if let IndexState::Uninitialized = self.state {
            let dimension = embedding.len();
            info!("Initializing memory index with dimension {}", dimension);
            self.state = IndexState::Active {
                dimension,
                index: (self.index_factory)(dimension),
            };
        }

        if let IndexState::Active { index, .. } = &mut self.state {
            index.add(&embedding)?;
        }
        self.memories.push_back(text);

        debug!("Memory added (total: {})", self.memories.len());
        Ok(())
    }

    fn evict_oldest(&mut self) {
        if let IndexState::Active { index, .. } = &mut self.state {
            if index.remove_oldest() {
                if let Some(evicted) = self.memories.pop_front() {
                    debug!("Evicted oldest memory: {}", evicted);
                }
            }
        }
    }

    /// Texts of the `k` memories closest to `query`, closest first
    pub async fn recall(&self, query: &str, k: usize) -> DelveResult<Vec<String>> {
        Ok(self
            .recall_scored(query, k)
            .await?
            .into_iter()
            .map(|memory| memory.text)
            .collect())
    }

    /// Like `recall`, with positions and distances
    pub async fn recall_scored(&self, query: &str, k: usize) -> DelveResult<Vec<RecalledMemory>> {
        if self.memories.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        self.recall_by_embedding(&query_embedding, k)
    }

    /// Search with a pre-computed query embedding
    pub fn recall_by_embedding(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> DelveResult<Vec<RecalledMemory>> {
        let index = match &self.state {
            IndexState::Active { index, .. } if !self.memories.is_empty() && k > 0 => index,
            _ => return Ok(Vec::new()),
        };

        let (distances, positions) = index.search(query_embedding, k.min(self.memories.len()))?;

        Ok(positions
            .into_iter()
            .zip(distances)
            .filter_map(|(position, distance)| {
                self.memories.get(position).map(|text| RecalledMemory {
                    position,
                    text: text.clone(),
                    distance,
                })
            })
            .collect())
    }

    /// Number of stored memories
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Dimension fixed by the first insert, if any
    pub fn dimension(&self) -> Option<usize> {
        match &self.state {
            IndexState::Uninitialized => None,
            IndexState::Active { dimension, .. } => Some(*dimension),
        }
    }

    /// Stored texts in position order
    pub fn memories(&self) -> impl Iterator<Item = &str> {
        self.memories.iter().map(String::as_str)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}
