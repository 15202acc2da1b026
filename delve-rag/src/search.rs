//! Web search providers
//!
//! `DuckDuckGoSearch` talks to the DuckDuckGo Instant Answer API, which needs no
//! API key and returns an abstract, direct results and related topics as JSON.

use async_trait::async_trait;
use delve_core::{
    config_error, DelveError, DelveResult, ErrorContext, NetworkConfig, SearchConfig, SearchProvider, WebHit,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// DuckDuckGo Instant Answer search
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
    region: Option<String>,
    timeout_ms: u64,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig, timeout_ms: u64) -> DelveResult<Self> {
        url::Url::parse(&config.base_url).map_err(|e| DelveError::Configuration {
            message: format!("Invalid search base URL '{}': {}", config.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("duckduckgo_search").with_operation("new"),
        })?;

        Ok(Self {
            client: create_http_client(&config.user_agent, timeout_ms)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            region: config.region.clone(),
            timeout_ms,
        })
    }

    fn request_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}/?q={}&format=json&no_redirect=1&no_html=1&skip_disambig=1",
            self.base_url,
            urlencoding::encode(query)
        );
        if let Some(region) = &self.region {
            url.push_str("&kl=");
            url.push_str(&urlencoding::encode(region));
        }
        url
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> DelveResult<Vec<WebHit>> {
        let url = self.request_url(query);
        debug!("Searching DuckDuckGo: {}", query);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                DelveError::Timeout {
                    operation: "duckduckgo_search".to_string(),
                    duration_ms: self.timeout_ms,
                    context: ErrorContext::new("duckduckgo_search").with_operation("search"),
                }
            } else {
                DelveError::network("Search request failed", "duckduckgo_search", e)
            }
        })?;

        if !response.status().is_success() {
            return Err(handle_response_error(response, "search").await);
        }

        let answer: InstantAnswer = response.json().await.map_err(|e| DelveError::Search {
            message: format!("Failed to parse search response: {}", e),
            provider: Some("duckduckgo".to_string()),
            context: ErrorContext::new("duckduckgo_search").with_operation("search"),
        })?;

        let hits = parse_instant_answer(answer, max_results);
        info!("DuckDuckGo returned {} results for '{}'", hits.len(), query);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "Results")]
    results: Vec<Topic>,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<Topic>,
}

/// Either a single result or a named group of nested topics
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Topic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
    #[serde(rename = "Topics")]
    topics: Vec<Topic>,
}

fn parse_instant_answer(answer: InstantAnswer, max_results: usize) -> Vec<WebHit> {
    let mut hits = Vec::new();

    if !answer.abstract_text.is_empty() {
        hits.push(WebHit {
            title: answer.heading,
            snippet: answer.abstract_text,
            url: answer.abstract_url,
        });
    }

    let mut topics = Vec::new();
    flatten_topics(answer.results, &mut topics);
    flatten_topics(answer.related_topics, &mut topics);

    hits.extend(
        topics
            .into_iter()
            .filter(|topic| !topic.text.is_empty())
            .map(|topic| WebHit {
                title: title_from_url(&topic.first_url).unwrap_or_else(|| topic.text.clone()),
                snippet: topic.text,
                url: topic.first_url,
            }),
    );

    hits.truncate(max_results);
    hits
}

fn flatten_topics(topics: Vec<Topic>, out: &mut Vec<Topic>) {
    for mut topic in topics {
        if topic.topics.is_empty() {
            out.push(topic);
        } else {
            flatten_topics(std::mem::take(&mut topic.topics), out);
        }
    }
}

/// "https://duckduckgo.com/Paris_Agreement" -> "Paris Agreement"
fn title_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let title = decoded.replace('_', " ");
    (!title.trim().is_empty()).then_some(title)
}

fn create_http_client(user_agent: &str, timeout_ms: u64) -> DelveResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(user_agent).map_err(|e| {
            DelveError::Configuration {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .default_headers(headers)
        .build()
        .map_err(|e| DelveError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// `Retry-After` in delta-seconds, as milliseconds
fn parse_retry_after(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|seconds| seconds.saturating_mul(1000))
}

async fn handle_response_error(response: reqwest::Response, operation: &str) -> DelveError {
    let status = response.status();
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();
    let message = format!(
        "HTTP {}: {}",
        status.as_u16(),
        if body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error")
        } else {
            &body
        }
    );
    let context = ErrorContext::new("duckduckgo_search").with_operation(operation);

    match status.as_u16() {
        429 => DelveError::RateLimit {
            message,
            retry_after_ms,
            context,
        },
        500..=599 => DelveError::Network {
            message,
            source: None,
            context: context.with_suggestion("Check network connectivity and API status"),
        },
        _ => DelveError::Search {
            message,
            provider: Some("duckduckgo".to_string()),
            context,
        },
    }
}

/// Create the search provider named by `config.provider`
pub fn create_search_provider(
    config: &SearchConfig,
    network: &NetworkConfig,
) -> DelveResult<Arc<dyn SearchProvider>> {
    match config.provider.as_str() {
        "duckduckgo" => Ok(Arc::new(DuckDuckGoSearch::new(
            config,
            network.request_timeout_ms,
        )?)),
        provider => Err(config_error!(
            format!("Unsupported search provider: {} (supported: duckduckgo)", provider),
            "search_factory"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "Heading": "Paris",
        "AbstractText": "Paris is the capital and largest city of France.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Paris",
        "Results": [
            {"Text": "Official site", "FirstURL": "https://www.paris.fr/"}
        ],
        "RelatedTopics": [
            {"Text": "Eiffel Tower - Wrought-iron lattice tower", "FirstURL": "https://duckduckgo.com/Eiffel_Tower"},
            {"Name": "Places", "Topics": [
                {"Text": "Louvre - Art museum", "FirstURL": "https://duckduckgo.com/Louvre"}
            ]},
            {"Text": "", "FirstURL": "https://duckduckgo.com/Empty"}
        ]
    }"#;

    fn parse(max_results: usize) -> Vec<WebHit> {
        let answer: InstantAnswer = serde_json::from_str(FIXTURE).unwrap();
        parse_instant_answer(answer, max_results)
    }

    #[test]
    fn test_abstract_comes_first() {
        let hits = parse(10);
        assert_eq!(hits[0].title, "Paris");
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/Paris");
        assert!(hits[0].snippet.contains("capital"));
    }

    #[test]
    fn test_nested_topics_are_flattened() {
        let hits = parse(10);
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Paris", "Official site", "Eiffel Tower", "Louvre"]);
    }

    #[test]
    fn test_truncates_to_max_results() {
        assert_eq!(parse(2).len(), 2);
        assert!(parse(0).is_empty());
    }

    #[test]
    fn test_empty_response() {
        let answer: InstantAnswer = serde_json::from_str("{}").unwrap();
        assert!(parse_instant_answer(answer, 5).is_empty());
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(
            title_from_url("https://duckduckgo.com/Paris_Agreement").as_deref(),
            Some("Paris Agreement")
        );
        assert_eq!(title_from_url("not a url"), None);
    }

    #[test]
    fn test_request_url_encodes_query_and_region() {
        let config = SearchConfig {
            region: Some("fr-fr".to_string()),
            ..SearchConfig::default()
        };
        let search = DuckDuckGoSearch::new(&config, 1000).unwrap();
        let url = search.request_url("capital of France?");
        assert!(url.contains("q=capital%20of%20France%3F"));
        assert!(url.ends_with("&kl=fr-fr"));
    }

    #[test]
    fn test_retry_after_header() {
        assert_eq!(parse_retry_after("3"), Some(3000));
        assert_eq!(parse_retry_after(" 0 "), Some(0));
        assert_eq!(parse_retry_after("99999999999999999"), Some(u64::MAX));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = SearchConfig {
            provider: "bing".to_string(),
            ..SearchConfig::default()
        };
        assert!(create_search_provider(&config, &NetworkConfig::default()).is_err());
    }
}
