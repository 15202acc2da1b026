//! Web retrieval for planned queries

use super::types::{SearchQuery, SearchResult};
use delve_core::{call_with_retry, NetworkConfig, SearchProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs queries against a search provider. Failures become empty result lists.
pub struct WebRetriever {
    provider: Arc<dyn SearchProvider>,
    network: NetworkConfig,
}

impl WebRetriever {
    pub fn new(provider: Arc<dyn SearchProvider>, network: NetworkConfig) -> Self {
        Self { provider, network }
    }

    /// Up to `max_results` results for one query
    pub async fn search_web(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let hits = call_with_retry(
            || self.provider.search(query, max_results),
            self.network.request_timeout_ms,
            &self.network.retry,
            "search_web",
        )
        .await;

        match hits {
            Ok(hits) => hits
                .into_iter()
                .take(max_results)
                .map(|hit| SearchResult::from_hit(hit, query))
                .collect(),
            Err(e) => {
                warn!(
                    "Error during web search via {} for query '{}': {}",
                    self.provider.name(),
                    query,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Search every query in order and concatenate the results
    pub async fn fetch_information(
        &self,
        queries: &[SearchQuery],
        results_per_query: usize,
    ) -> Vec<SearchResult> {
        let mut all_results = Vec::new();

        for query in queries {
            info!("Searching: {}", query);
            let results = self.search_web(query, results_per_query).await;
            debug!("{} results for '{}'", results.len(), query);
            all_results.extend(results);
        }

        all_results
    }
}
