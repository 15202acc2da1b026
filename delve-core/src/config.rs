//! Configuration management

use crate::error::{DelveError, DelveResult, ErrorContext};
use crate::types::*;
use crate::RetryConfig;

use std::path::{Path, PathBuf};

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: None,
            dimension: 384,
            batch_size: 64,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            base_url: "https://api.duckduckgo.com".to_string(),
            region: None,
            user_agent: "delve/0.1".to_string(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            num_queries: 3,
            results_per_query: 3,
            planner_temperature: 0.7,
            planner_max_tokens: 200,
            synthesis_temperature: 0.3,
            synthesis_max_tokens: 1000,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: None,
            on_full: CapacityPolicy::Reject,
            recall_k: 3,
            short_term_limit: 5,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            retry: RetryConfig::default(),
        }
    }
}

impl DelveConfig {
    /// Default location: `~/.delve/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".delve").join("config.toml"))
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DelveError::Configuration {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DelveConfig =
            toml::from_str(&content).map_err(|e| DelveError::Configuration {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        Ok(config)
    }

    /// Load from `path`, or from the default location, or fall back to defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> DelveResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(default)?,
                _ => Self::default(),
            },
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Configuration {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| DelveError::Configuration {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply `DELVE_*` environment variable overrides
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("DELVE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("DELVE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("DELVE_LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Ok(region) = std::env::var("DELVE_SEARCH_REGION") {
            self.search.region = Some(region);
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> DelveResult<()> {
        if self.llm.model.trim().is_empty() {
            return Err(Self::invalid("llm.model must not be empty", "Set llm.model"));
        }

        if self.embedding.dimension == 0 {
            return Err(Self::invalid(
                "Embedding dimension must be greater than 0",
                "Set embedding.dimension to a positive value",
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Self::invalid(
                "Embedding batch_size must be greater than 0",
                "Set embedding.batch_size to a positive value",
            ));
        }

        if self.research.num_queries == 0 || self.research.results_per_query == 0 {
            return Err(Self::invalid(
                "research.num_queries and research.results_per_query must be at least 1",
                "Set both values to 1 or more",
            ));
        }

        for (name, temperature) in [
            ("research.planner_temperature", self.research.planner_temperature),
            ("research.synthesis_temperature", self.research.synthesis_temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Self::invalid(
                    &format!("{} must be between 0.0 and 2.0", name),
                    "Use a temperature in the 0.0-2.0 range",
                ));
            }
        }

        if self.memory.max_memories == Some(0) {
            return Err(Self::invalid(
                "memory.max_memories must be greater than 0 when set",
                "Remove memory.max_memories for an unbounded store",
            ));
        }

        if self.network.request_timeout_ms == 0 {
            return Err(Self::invalid(
                "network.request_timeout_ms must be greater than 0",
                "Set network.request_timeout_ms to a positive value",
            ));
        }

        Ok(())
    }

    fn invalid(message: &str, suggestion: &str) -> DelveError {
        DelveError::Configuration {
            message: message.to_string(),
            source: None,
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion(suggestion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DelveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.num_queries, 3);
        assert!(config.research.planner_temperature > config.research.synthesis_temperature);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DelveConfig = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"

            [memory]
            max_memories = 10
            on_full = "evict_oldest"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.memory.max_memories, Some(10));
        assert_eq!(config.memory.on_full, CapacityPolicy::EvictOldest);
        assert_eq!(config.research.results_per_query, 3);
    }

    #[test]
    fn test_partial_retry_table_uses_defaults() {
        let config: DelveConfig = toml::from_str(
            r#"
            [network.retry]
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.network.retry.max_attempts, 4);
        assert_eq!(config.network.retry.max_delay_ms, 5000);
        assert_eq!(config.network.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_validation_rejects_zero_queries() {
        let mut config = DelveConfig::default();
        config.research.num_queries = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DelveError::Configuration { .. }));
        assert!(err.is_structural());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DelveConfig::default();
        config.search.region = Some("us-en".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = DelveConfig::from_file(&path).unwrap();
        assert_eq!(loaded.search.region.as_deref(), Some("us-en"));
        assert_eq!(loaded.network.request_timeout_ms, 30_000);
    }
}
