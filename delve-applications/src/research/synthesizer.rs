//! Answer synthesis from numbered sources

use super::types::{SearchResult, SYNTHESIS_ERROR_PREFIX};
use delve_core::{
    call_with_retry, ChatModel, CompletionRequest, NetworkConfig, PromptMessage, ResearchConfig,
};
use std::sync::Arc;
use tracing::{error, info};

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a research assistant that synthesizes information from multiple sources \
to provide accurate, comprehensive answers.

Your responsibilities:
1. Analyze all provided sources carefully
2. Extract relevant information that answers the question
3. Synthesize information into a clear, well-structured answer
4. Cite sources by referencing [Source N] numbers
5. If sources conflict, acknowledge different perspectives
6. If information is insufficient, state what's missing

Provide factual, balanced answers based on the evidence.";

/// Writes a cited answer from search results
pub struct Synthesizer {
    model: Arc<dyn ChatModel>,
    config: ResearchConfig,
    network: NetworkConfig,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn ChatModel>, config: ResearchConfig, network: NetworkConfig) -> Self {
        Self {
            model,
            config,
            network,
        }
    }

    /// Answer `question` from `results`.
    ///
    /// A failed model call is reported in-band as
    /// `"Error generating summary: <error>"`.
    pub async fn summarize_answer(&self, question: &str, results: &[SearchResult]) -> String {
        info!(
            "Synthesizing answer for '{}' from {} sources",
            question,
            results.len()
        );

        let user_prompt = format!(
            "Question: {}\n\n\
             Search Results:\n{}\n\n\
             Based on these search results, provide a comprehensive answer to the question.\n\
             Include relevant citations using [Source N] format. Structure your answer clearly.",
            question,
            format_sources(results)
        );

        let request = CompletionRequest::new(vec![
            PromptMessage::system(SYNTHESIS_SYSTEM_PROMPT),
            PromptMessage::user(user_prompt),
        ])
        .with_temperature(self.config.synthesis_temperature)
        .with_max_tokens(self.config.synthesis_max_tokens);

        let completion = call_with_retry(
            || self.model.complete(request.clone()),
            self.network.request_timeout_ms,
            &self.network.retry,
            "summarize_answer",
        )
        .await;

        match completion {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                error!("Synthesis failed: {}", e);
                format!("{}{}", SYNTHESIS_ERROR_PREFIX, e)
            }
        }
    }
}

/// `[Source N]` blocks, 1-based in input order
pub fn format_sources(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[Source {}]\nTitle: {}\nContent: {}\nURL: {}\n",
                i + 1,
                result.title,
                result.snippet,
                result.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            snippet: format!("About {}", title),
            url: url.to_string(),
            query: "q".to_string(),
        }
    }

    #[test]
    fn test_format_sources_numbering() {
        let text = format_sources(&[
            result("Paris", "https://a.example"),
            result("Lyon", "https://b.example"),
        ]);

        assert!(text.starts_with("[Source 1]\nTitle: Paris\nContent: About Paris\nURL: https://a.example\n"));
        assert!(text.contains("\n[Source 2]\nTitle: Lyon\n"));
        assert!(!text.contains("[Source 3]"));
    }

    #[test]
    fn test_format_sources_empty() {
        assert_eq!(format_sources(&[]), "");
    }
}
