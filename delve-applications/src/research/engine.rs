//! Research orchestration: plan, retrieve, synthesize

use super::{
    planner::QueryPlanner,
    retriever::WebRetriever,
    synthesizer::Synthesizer,
    types::{ResearchResult, NO_INFORMATION_ANSWER},
};
use delve_core::{
    invalid_argument, log_operation_error, log_operation_start, log_operation_success,
    performance::measure_async, ChatModel, DelveConfig, DelveResult, NetworkConfig,
    ResearchConfig, SearchProvider,
};
use std::sync::Arc;
use tracing::info;

/// Research engine answering questions from the web
pub struct ResearchEngine {
    planner: QueryPlanner,
    retriever: WebRetriever,
    synthesizer: Synthesizer,
    config: ResearchConfig,
}

impl ResearchEngine {
    /// Create an engine from explicit service handles
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
        network: NetworkConfig,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(model.clone(), config.clone(), network.clone()),
            retriever: WebRetriever::new(search, network.clone()),
            synthesizer: Synthesizer::new(model, config.clone(), network),
            config,
        }
    }

    /// Create an engine with the chat model and search provider named in `config`
    pub fn from_config(config: &DelveConfig) -> DelveResult<Self> {
        let model = delve_rag::create_chat_model(&config.llm)?;
        let search = delve_rag::create_search_provider(&config.search, &config.network)?;

        info!(
            "Research engine ready - model: {}, search: {}",
            model.describe(),
            search.name()
        );

        Ok(Self::new(
            model,
            search,
            config.research.clone(),
            config.network.clone(),
        ))
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research with the configured query and result counts
    pub async fn research_with_defaults(&self, question: &str) -> DelveResult<ResearchResult> {
        self.research(
            question,
            self.config.num_queries,
            self.config.results_per_query,
        )
        .await
    }

    /// Answer `question` from up to `num_queries` searches of
    /// `results_per_query` results each.
    ///
    /// Only invalid arguments are returned as errors. Model and search
    /// failures degrade the result instead: the planner falls back to the
    /// question, failed searches contribute nothing, and a failed synthesis
    /// leaves its error text in `answer`.
    pub async fn research(
        &self,
        question: &str,
        num_queries: usize,
        results_per_query: usize,
    ) -> DelveResult<ResearchResult> {
        let question = question.trim();
        if let Err(e) = validate_request(question, num_queries, results_per_query) {
            log_operation_error!("research", e);
            return Err(e);
        }

        log_operation_start!(
            "research",
            question = question,
            num_queries = num_queries,
            results_per_query = results_per_query
        );

        let queries = measure_async(
            "plan_queries",
            self.planner.decide_search_queries(question, num_queries),
        )
        .await;
        info!("Generated queries: {:?}", queries);

        let sources = measure_async(
            "fetch_information",
            self.retriever.fetch_information(&queries, results_per_query),
        )
        .await;
        info!("Found {} results", sources.len());

        if sources.is_empty() {
            log_operation_success!("research", sources = 0usize);
            return Ok(ResearchResult {
                question: question.to_string(),
                queries,
                answer: NO_INFORMATION_ANSWER.to_string(),
                sources,
            });
        }

        let answer = measure_async(
            "summarize_answer",
            self.synthesizer.summarize_answer(question, &sources),
        )
        .await;

        let result = ResearchResult {
            question: question.to_string(),
            queries,
            answer,
            sources,
        };

        log_operation_success!(
            "research",
            sources = result.sources.len(),
            soft_failure = result.is_soft_failure()
        );
        Ok(result)
    }
}

fn validate_request(
    question: &str,
    num_queries: usize,
    results_per_query: usize,
) -> DelveResult<()> {
    if question.is_empty() {
        return Err(invalid_argument!(
            "Question must not be empty",
            "question",
            "research_engine"
        ));
    }
    if num_queries == 0 {
        return Err(invalid_argument!(
            "num_queries must be at least 1",
            "num_queries",
            "research_engine"
        ));
    }
    if results_per_query == 0 {
        return Err(invalid_argument!(
            "results_per_query must be at least 1",
            "results_per_query",
            "research_engine"
        ));
    }
    Ok(())
}
