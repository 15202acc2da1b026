//! LLM client integration using siumai
//!
//! This module provides a `ChatModel` implementation backed by the siumai
//! framework, supporting OpenAI, Anthropic, Ollama and Groq.

use async_trait::async_trait;
use delve_core::{
    config_error, ChatModel, ChatRole, CompletionRequest, DelveError, DelveResult, ErrorContext,
    LlmConfig,
};
use siumai::models;
use siumai::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type SharedClient = Arc<dyn LlmClient + Send + Sync>;

/// Clients are built per sampling setup because siumai fixes temperature and
/// max tokens at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClientKey {
    temperature_bits: u32,
    max_tokens: Option<u32>,
}

/// Chat model backed by a siumai provider client
pub struct SiumaiChatModel {
    config: LlmConfig,
    api_key: Option<String>,
    clients: Mutex<HashMap<ClientKey, SharedClient>>,
}

impl SiumaiChatModel {
    /// Create a new chat model.
    ///
    /// Fails with `DelveError::Configuration` when the provider is unknown or its
    /// API key is neither configured nor present in the environment.
    pub fn new(config: LlmConfig) -> DelveResult<Self> {
        let api_key = match api_key_env(&config.provider)? {
            Some(env_var) => Some(resolve_api_key(
                config.api_key.as_deref(),
                env_var,
                &config.provider,
            )?),
            None => None,
        };

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self {
            config,
            api_key,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn client_for(&self, temperature: f32, max_tokens: Option<u32>) -> DelveResult<SharedClient> {
        let key = ClientKey {
            temperature_bits: temperature.to_bits(),
            max_tokens,
        };

        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let client: SharedClient = Arc::from(self.build_client(temperature, max_tokens).await?);
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(
        &self,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> DelveResult<Box<dyn LlmClient + Send + Sync>> {
        let config = &self.config;
        let api_key = self.api_key.clone().unwrap_or_default();

        match config.provider.as_str() {
            "openai" => {
                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(temperature);

                if let Some(max_tokens) = max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.llm_error(format!("Failed to build OpenAI client: {}", e)))?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(temperature);

                if let Some(max_tokens) = max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    self.llm_error(format!("Failed to build Anthropic client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(temperature);

                if let Some(max_tokens) = max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.llm_error(format!("Failed to build Ollama client: {}", e)))?;

                Ok(Box::new(client))
            }
            "groq" => {
                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(temperature);

                if let Some(max_tokens) = max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.llm_error(format!("Failed to build Groq client: {}", e)))?;

                Ok(Box::new(client))
            }
            provider => Err(unsupported_provider(provider)),
        }
    }

    fn llm_error(&self, message: String) -> DelveError {
        DelveError::Llm {
            message,
            provider: Some(self.config.provider.clone()),
            model: Some(self.config.model.clone()),
            context: ErrorContext::new("llm_client").with_operation("build_client"),
        }
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    async fn complete(&self, request: CompletionRequest) -> DelveResult<String> {
        let start_time = Instant::now();
        let client = self
            .client_for(request.temperature, request.max_tokens)
            .await?;

        let messages: Vec<ChatMessage> = request
            .messages
            .iter()
            .map(|message| match message.role {
                ChatRole::System => ChatMessage::system(message.content.clone()).build(),
                ChatRole::User => ChatMessage::user(message.content.clone()).build(),
                ChatRole::Assistant => ChatMessage::assistant(message.content.clone()).build(),
            })
            .collect();

        debug!("Generating response with {} messages", messages.len());

        let response = client
            .chat(messages)
            .await
            .map_err(|e| classify_llm_error(&e.to_string(), &self.config))?;

        match response.content_text() {
            Some(content) if !content.trim().is_empty() => {
                info!(
                    "Generated response in {:?} ({} chars)",
                    start_time.elapsed(),
                    content.len()
                );
                Ok(content.to_string())
            }
            _ => Err(DelveError::Llm {
                message: "No text content in LLM response".to_string(),
                provider: Some(self.config.provider.clone()),
                model: Some(self.config.model.clone()),
                context: ErrorContext::new("llm_client").with_operation("complete"),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }
}

/// Environment variable holding the API key for `provider`; `None` when the
/// provider needs no key.
pub fn api_key_env(provider: &str) -> DelveResult<Option<&'static str>> {
    match provider {
        "openai" => Ok(Some("OPENAI_API_KEY")),
        "anthropic" => Ok(Some("ANTHROPIC_API_KEY")),
        "groq" => Ok(Some("GROQ_API_KEY")),
        "ollama" => Ok(None),
        other => Err(unsupported_provider(other)),
    }
}

/// Use the explicit key if present, otherwise read `env_var`. Blank values count as missing.
pub fn resolve_api_key(explicit: Option<&str>, env_var: &str, provider: &str) -> DelveResult<String> {
    explicit
        .map(str::to_string)
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| DelveError::Configuration {
            message: format!("{} API key not found", provider),
            source: None,
            context: ErrorContext::new("llm_client")
                .with_operation("resolve_api_key")
                .with_metadata("env_var", env_var)
                .with_suggestion(&format!("Set {} or llm.api_key in the config file", env_var)),
        })
}

fn unsupported_provider(provider: &str) -> DelveError {
    config_error!(
        format!(
            "Unsupported LLM provider: {} (supported: openai, anthropic, ollama, groq)",
            provider
        ),
        "llm_client"
    )
}

/// Map a provider error message onto the error kinds the retry policy understands
fn classify_llm_error(message: &str, config: &LlmConfig) -> DelveError {
    let lower = message.to_lowercase();
    let context = ErrorContext::new("llm_client")
        .with_operation("complete")
        .with_metadata("provider", &config.provider);

    if lower.contains("rate limit") || lower.contains("429") {
        DelveError::RateLimit {
            message: message.to_string(),
            retry_after_ms: None,
            context,
        }
    } else if lower.contains("timeout") || lower.contains("timed out") {
        DelveError::Timeout {
            operation: "llm_complete".to_string(),
            duration_ms: 0,
            context,
        }
    } else if lower.contains("connection") || lower.contains("network") || lower.contains("dns") {
        DelveError::Network {
            message: message.to_string(),
            source: None,
            context,
        }
    } else {
        DelveError::Llm {
            message: format!("LLM generation failed: {}", message),
            provider: Some(config.provider.clone()),
            model: Some(config.model.clone()),
            context,
        }
    }
}

/// Helper functions for creating common LLM configurations
pub mod configs {
    use super::*;

    /// OpenAI GPT-4o-mini configuration
    pub fn openai_gpt4o_mini() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: models::openai::GPT_4O_MINI.to_string(),
            api_key: None,
            base_url: None,
        }
    }

    /// Anthropic Claude Haiku configuration
    pub fn anthropic_claude_haiku() -> LlmConfig {
        LlmConfig {
            provider: "anthropic".to_string(),
            model: models::anthropic::CLAUDE_HAIKU_3_5.to_string(),
            api_key: None,
            base_url: None,
        }
    }

    /// Groq configuration
    pub fn groq_llama3() -> LlmConfig {
        LlmConfig {
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            base_url: None,
        }
    }

    /// Ollama configuration
    pub fn ollama_llama3(base_url: Option<String>) -> LlmConfig {
        LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            base_url: base_url.or_else(|| Some("http://localhost:11434".to_string())),
        }
    }
}

/// Create a client for the first provider whose API key is set, falling back to Ollama
pub fn create_auto_client() -> DelveResult<SiumaiChatModel> {
    let providers = vec![
        ("openai", "OPENAI_API_KEY", configs::openai_gpt4o_mini()),
        (
            "anthropic",
            "ANTHROPIC_API_KEY",
            configs::anthropic_claude_haiku(),
        ),
        ("groq", "GROQ_API_KEY", configs::groq_llama3()),
    ];

    for (provider_name, env_var, config) in providers {
        if std::env::var(env_var).is_ok() {
            info!("Auto-detected {} provider", provider_name);
            match SiumaiChatModel::new(config) {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Failed to create {} client: {}", provider_name, e);
                    continue;
                }
            }
        }
    }

    info!("Trying Ollama as fallback");
    SiumaiChatModel::new(configs::ollama_llama3(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = resolve_api_key(None, "DELVE_TEST_UNSET_API_KEY", "openai").unwrap_err();
        assert!(matches!(err, DelveError::Configuration { .. }));
        assert!(err.is_structural());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let key = resolve_api_key(Some("sk-test"), "DELVE_TEST_UNSET_API_KEY", "openai").unwrap();
        assert_eq!(key, "sk-test");

        let blank = resolve_api_key(Some("  "), "DELVE_TEST_UNSET_API_KEY", "openai");
        assert!(blank.is_err());
    }

    #[test]
    fn test_blank_config_key_falls_back_to_env() {
        std::env::set_var("DELVE_TEST_FALLBACK_API_KEY", "sk-from-env");
        let key = resolve_api_key(Some("   "), "DELVE_TEST_FALLBACK_API_KEY", "groq").unwrap();
        assert_eq!(key, "sk-from-env");
    }

    #[test]
    fn test_unknown_provider_error_lists_supported() {
        let err = api_key_env("mystery").unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("supported: openai"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let model = SiumaiChatModel::new(configs::ollama_llama3(None)).unwrap();
        assert_eq!(model.describe(), "ollama/llama3.2");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "mystery".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            SiumaiChatModel::new(config),
            Err(DelveError::Configuration { .. })
        ));
    }

    #[test]
    fn test_error_classification() {
        let config = LlmConfig::default();
        assert!(classify_llm_error("HTTP 429 rate limit", &config).is_recoverable());
        assert!(classify_llm_error("request timed out", &config).is_recoverable());
        assert!(!classify_llm_error("invalid model", &config).is_recoverable());
    }
}
