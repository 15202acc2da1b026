//! Delve Applications - the research agent built on Delve's adapters
//!
//! This crate holds the application layer:
//!
//! - **Core** (delve-core): errors, configuration, logging and service traits
//! - **Adapters** (delve-rag): LLM, embeddings, web search and memory
//! - **Applications** (this crate): the query → search → synthesis pipeline
//! - **Presentation** (delve-cli): the command-line interface

pub mod research;

pub use research::{
    parse_questions, BatchItem, BatchStatus, QueryPlanner, ResearchEngine, ResearchResult,
    SearchQuery, SearchResult, Synthesizer, WebRetriever, NO_INFORMATION_ANSWER,
    SYNTHESIS_ERROR_PREFIX,
};
