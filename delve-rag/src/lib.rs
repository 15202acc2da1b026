//! Delve RAG - provider adapters and retrieval primitives
//!
//! This crate wires the `delve-core` traits to real services: chat models and
//! embeddings through siumai, web search through DuckDuckGo, plus the exact
//! L2 index and the memory stores built on top of it.

pub mod embeddings;
pub mod index;
pub mod llm_client;
pub mod memory;
pub mod search;

pub use embeddings::{create_embedder, HashingEmbedder, SiumaiEmbedder};
pub use index::{squared_l2, FlatL2Index};
pub use llm_client::{configs, create_auto_client, SiumaiChatModel};
pub use memory::{IndexFactory, RecalledMemory, ShortTermMemory, VectorMemoryStore};
pub use search::{create_search_provider, DuckDuckGoSearch};

use delve_core::{ChatModel, DelveResult, LlmConfig};
use std::sync::Arc;

/// Create the chat model described by `config`; provider `"auto"` picks the
/// first provider with an API key in the environment
pub fn create_chat_model(config: &LlmConfig) -> DelveResult<Arc<dyn ChatModel>> {
    let model = match config.provider.as_str() {
        "auto" => create_auto_client()?,
        _ => SiumaiChatModel::new(config.clone())?,
    };
    Ok(Arc::new(model))
}
