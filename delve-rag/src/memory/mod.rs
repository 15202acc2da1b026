//! Agent memory
//!
//! - `vector_store`: long-term memory recalled by meaning through embeddings
//! - `short_term`: bounded window of the latest conversation turns

pub mod short_term;
pub mod vector_store;

pub use short_term::ShortTermMemory;
pub use vector_store::{IndexFactory, RecalledMemory, VectorMemoryStore};
