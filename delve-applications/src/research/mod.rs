//! Web research agent
//!
//! A question goes through three stages:
//! - the planner asks the chat model for search queries
//! - the retriever runs each query against the search provider
//! - the synthesizer writes an answer citing the results as `[Source N]`

pub mod batch;
pub mod engine;
pub mod planner;
pub mod retriever;
pub mod synthesizer;
pub mod types;

pub use batch::{parse_questions, BatchItem, BatchStatus};
pub use engine::ResearchEngine;
pub use planner::QueryPlanner;
pub use retriever::WebRetriever;
pub use synthesizer::Synthesizer;
pub use types::*;
