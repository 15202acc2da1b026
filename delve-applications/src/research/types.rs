//! Research data types

use delve_core::WebHit;
use serde::{Deserialize, Serialize};

/// A search string produced by the query planner
pub type SearchQuery = String;

/// Fixed answer returned when retrieval finds nothing
pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information to answer your question.";

/// Prefix of the answer produced when synthesis fails
pub const SYNTHESIS_ERROR_PREFIX: &str = "Error generating summary: ";

/// One web result, tagged with the query that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    /// Query this result was retrieved for
    pub query: SearchQuery,
}

impl SearchResult {
    pub fn from_hit(hit: WebHit, query: &str) -> Self {
        Self {
            title: hit.title,
            snippet: hit.snippet,
            url: hit.url,
            query: query.to_string(),
        }
    }
}

/// Outcome of one research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub question: String,
    /// Planned queries, in the order they were searched
    pub queries: Vec<SearchQuery>,
    pub answer: String,
    /// Every result handed to the synthesizer; `[Source N]` is `sources[N - 1]`
    pub sources: Vec<SearchResult>,
}

impl ResearchResult {
    /// Synthesis failed and `answer` carries the error text
    pub fn is_soft_failure(&self) -> bool {
        self.answer.starts_with(SYNTHESIS_ERROR_PREFIX)
    }

    /// Retrieval came back empty
    pub fn is_no_information(&self) -> bool {
        self.sources.is_empty() && self.answer == NO_INFORMATION_ANSWER
    }

    /// The run completed but produced no usable answer
    pub fn is_degraded(&self) -> bool {
        self.is_soft_failure() || self.is_no_information()
    }
}
