//! Embedding generation
//!
//! Two `TextEmbedder` implementations: a siumai-backed client for hosted
//! embedding models and a deterministic hashing embedder that works offline.

use async_trait::async_trait;
use delve_core::{
    call_with_retry, DelveError, DelveResult, EmbeddingConfig, ErrorContext, NetworkConfig,
    TextEmbedder,
};
use siumai::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::llm_client::resolve_api_key;

/// Embedding client that calls a provider's embedding endpoint through siumai
pub struct SiumaiEmbedder {
    config: EmbeddingConfig,
    network: NetworkConfig,
    client: Box<dyn LlmClient + Send + Sync>,
}

impl SiumaiEmbedder {
    /// Build the embedding client
    pub async fn connect(config: EmbeddingConfig, network: NetworkConfig) -> DelveResult<Self> {
        let client: Box<dyn LlmClient + Send + Sync> = match config.provider.as_str() {
            "openai" => {
                let api_key =
                    resolve_api_key(config.api_key.as_deref(), "OPENAI_API_KEY", "OpenAI")?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model);

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                Box::new(builder.build().await.map_err(|e| DelveError::Embedding {
                    message: format!("Failed to create OpenAI client: {}", e),
                    provider: Some("openai".to_string()),
                    context: ErrorContext::new("embeddings").with_operation("connect"),
                })?)
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                Box::new(
                    LlmBuilder::new()
                        .ollama()
                        .model(&config.model)
                        .base_url(&base_url)
                        .build()
                        .await
                        .map_err(|e| DelveError::Embedding {
                            message: format!("Failed to create Ollama client: {}", e),
                            provider: Some("ollama".to_string()),
                            context: ErrorContext::new("embeddings").with_operation("connect"),
                        })?,
                )
            }
            provider => {
                return Err(DelveError::Configuration {
                    message: format!("Unsupported embedding provider: {}", provider),
                    source: None,
                    context: ErrorContext::new("embeddings")
                        .with_suggestion("Supported providers: hashing, openai, ollama"),
                });
            }
        };

        info!(
            "Initialized embedding client - Provider: {}, Model: {}, Batch Size: {}",
            config.provider, config.model, config.batch_size
        );

        Ok(Self {
            config,
            network,
            client,
        })
    }

    fn embedding_error(&self, message: String) -> DelveError {
        DelveError::Embedding {
            message,
            provider: Some(self.config.provider.clone()),
            context: ErrorContext::new("embeddings").with_operation("embed"),
        }
    }
}

#[async_trait]
impl TextEmbedder for SiumaiEmbedder {
    async fn embed(&self, texts: &[String]) -> DelveResult<Vec<Vec<f32>>> {
        let embedding_client = self.client.as_embedding_capability().ok_or_else(|| {
            DelveError::Configuration {
                message: format!(
                    "Provider {} does not support embeddings",
                    self.config.provider
                ),
                source: None,
                context: ErrorContext::new("embeddings"),
            }
        })?;

        let mut vectors = Vec::with_capacity(texts.len());

        // Process texts in batches to stay under provider request limits
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            debug!(
                "Calling embedding API - Provider: {}, Model: {}, Batch size: {}",
                self.config.provider,
                self.config.model,
                batch.len()
            );

            let response = call_with_retry(
                || async {
                    embedding_client.embed(batch.to_vec()).await.map_err(|e| {
                        error!(
                            "Embedding API call failed - Provider: {}, Model: {}, Error: {}",
                            self.config.provider, self.config.model, e
                        );
                        classify_embedding_error(&self.config.provider, e.to_string())
                    })
                },
                self.network.request_timeout_ms,
                &self.network.retry,
                "embed",
            )
            .await?;

            if response.embeddings.len() != batch.len() {
                return Err(self.embedding_error(format!(
                    "Expected {} embeddings, provider returned {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            vectors.extend(response.embeddings);
        }

        Ok(vectors)
    }
}

/// Transient transport failures are retried; everything else is final
fn classify_embedding_error(provider: &str, message: String) -> DelveError {
    let lowered = message.to_lowercase();
    let context = ErrorContext::new("embeddings").with_operation("embed");

    if lowered.contains("rate limit") || lowered.contains("429") {
        DelveError::RateLimit {
            message,
            retry_after_ms: None,
            context,
        }
    } else if lowered.contains("connection") || lowered.contains("network") {
        DelveError::Network {
            message,
            source: None,
            context,
        }
    } else {
        DelveError::Embedding {
            message: format!("Embedding API call failed: {}", message),
            provider: Some(provider.to_string()),
            context,
        }
    }
}

/// Deterministic offline embedder based on feature hashing.
///
/// Each lowercase word and each of its character trigrams is hashed into one of
/// `dimension` signed buckets; the result is L2-normalized. Texts sharing words
/// land close together under L2 distance, and identical texts map to identical
/// vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed one text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            self.accumulate(&mut vector, &word, 1.0);

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for trigram in padded.windows(3) {
                let trigram: String = trigram.iter().collect();
                self.accumulate(&mut vector, &trigram, 0.5);
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> DelveResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Create the embedder named by `config.provider`
pub async fn create_embedder(
    config: &EmbeddingConfig,
    network: &NetworkConfig,
) -> DelveResult<Arc<dyn TextEmbedder>> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        _ => Ok(Arc::new(
            SiumaiEmbedder::connect(config.clone(), network.clone()).await?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("User prefers Python examples");
        let b = embedder.embed_text("User prefers Python examples");

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_text("short Python answers");
        let related = embedder.embed_text("User prefers Python");
        let unrelated = embedder.embed_text("Meeting at the harbour tomorrow");

        assert!(squared_l2(&query, &related) < squared_l2(&query, &unrelated));
    }

    #[test]
    fn test_embed_one_matches_sync_embedding() {
        let embedder = HashingEmbedder::new(16);
        let vector = tokio_test::block_on(embedder.embed_one("hello world")).unwrap();
        assert_eq!(vector, embedder.embed_text("hello world"));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed_text("  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_embed_preserves_order() {
        let embedder = HashingEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed_text("alpha"));
        assert_eq!(vectors[1], embedder.embed_text("beta"));
    }

    #[test]
    fn test_transport_errors_are_recoverable() {
        assert!(classify_embedding_error("openai", "HTTP 429 Too Many Requests".into())
            .is_recoverable());
        assert!(!classify_embedding_error("openai", "invalid model".into()).is_recoverable());
    }

    #[tokio::test]
    async fn test_factory_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            create_embedder(&config, &NetworkConfig::default()).await,
            Err(DelveError::Configuration { .. })
        ));
    }
}
