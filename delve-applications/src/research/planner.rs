//! Query planning: turn a question into web search queries

use super::types::SearchQuery;
use delve_core::{
    call_with_retry, ChatModel, CompletionRequest, NetworkConfig, PromptMessage, ResearchConfig,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PLANNER_SYSTEM_PROMPT: &str = "You are a search query expert. Your job is to analyze a user's question \
and generate the most effective search queries to find relevant information.

Generate diverse, specific search queries that will help gather comprehensive information.
Consider different angles, related topics, and specific terms that would yield good results.";

/// Asks the chat model for search queries; never fails
pub struct QueryPlanner {
    model: Arc<dyn ChatModel>,
    config: ResearchConfig,
    network: NetworkConfig,
}

impl QueryPlanner {
    pub fn new(model: Arc<dyn ChatModel>, config: ResearchConfig, network: NetworkConfig) -> Self {
        Self {
            model,
            config,
            network,
        }
    }

    /// Plan up to `num_queries` search queries for `question`.
    ///
    /// Falls back to `[question]` when the model call fails or yields no
    /// usable line.
    pub async fn decide_search_queries(
        &self,
        question: &str,
        num_queries: usize,
    ) -> Vec<SearchQuery> {
        info!("Planning {} search queries for: {}", num_queries, question);

        let request = self.build_request(question, num_queries);
        let completion = call_with_retry(
            || self.model.complete(request.clone()),
            self.network.request_timeout_ms,
            &self.network.retry,
            "plan_queries",
        )
        .await;

        match completion {
            Ok(text) => {
                let queries = parse_queries(&text, num_queries);
                if queries.is_empty() {
                    warn!("Planner returned no queries, searching the question itself");
                    vec![question.to_string()]
                } else {
                    debug!("Planned queries: {:?}", queries);
                    queries
                }
            }
            Err(e) => {
                warn!("Error generating search queries: {}", e);
                vec![question.to_string()]
            }
        }
    }

    fn build_request(&self, question: &str, num_queries: usize) -> CompletionRequest {
        let user_prompt = format!(
            "Question: {}\n\n\
             Generate {} diverse and effective search queries to find information that will help answer this question.\n\
             Return ONLY the search queries, one per line, without numbering or additional text.",
            question, num_queries
        );

        CompletionRequest::new(vec![
            PromptMessage::system(PLANNER_SYSTEM_PROMPT),
            PromptMessage::user(user_prompt),
        ])
        .with_temperature(self.config.planner_temperature)
        .with_max_tokens(self.config.planner_max_tokens)
    }
}

/// One query per non-blank line, trimmed, at most `num_queries`
pub fn parse_queries(text: &str, num_queries: usize) -> Vec<SearchQuery> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(num_queries)
        .map(str::to_string)
        .collect()
}
