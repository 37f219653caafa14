//! Classifier configuration.
//!
//! Loaded from a TOML file or from `SPAMGATE_*` environment variables, with
//! a stub-provider default so the crate runs offline out of the box.

use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;
use crate::errors::ClassifierError;

/// Supported oracle providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProviderType {
    /// Deterministic canned responses, for tests and offline runs.
    Stub,
    /// OpenAI-compatible chat completions (OpenAI, OpenRouter, ...).
    OpenAi,
}

/// Oracle provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    /// Model name/identifier.
    pub model: String,
    /// API key (can be loaded from env).
    pub api_key: Option<String>,
    /// Base URL for custom endpoints (OpenRouter, local gateways).
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    /// 0.0 = deterministic, 1.0 = creative.
    pub temperature: Option<f64>,
    /// HTTP timeout in seconds.
    pub timeout_seconds: Option<u64>,
    /// Transport-level retries before a call is surfaced as failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Stub,
            model: "stub-model".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(1024),
            temperature: Some(0.0),
            timeout_seconds: Some(30),
            max_retries: default_max_retries(),
        }
    }
}

/// Top-level configuration for the classification core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    /// Input truncation bound applied during normalization, in characters.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_max_input_chars() -> usize {
    crate::fingerprint::MAX_INPUT_CHARS
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            cache: CacheSettings::default(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl ClassifierConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::Config(format!("failed to read {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| ClassifierError::Config(format!("failed to parse {}: {}", path, e)))
    }

    /// Load configuration from `SPAMGATE_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ClassifierError> {
        let mut config = ClassifierConfig::default();

        if let Ok(provider) = std::env::var("SPAMGATE_LLM_PROVIDER") {
            config.provider.provider_type = match provider.as_str() {
                "openai" | "openrouter" => {
                    if provider == "openrouter" && config.provider.base_url.is_none() {
                        config.provider.base_url =
                            Some("https://openrouter.ai/api/v1".to_string());
                    }
                    ProviderType::OpenAi
                }
                "stub" => ProviderType::Stub,
                other => {
                    return Err(ClassifierError::Config(format!(
                        "invalid provider '{}': use openai, openrouter, or stub",
                        other
                    )))
                }
            };
        }
        if let Ok(model) = std::env::var("SPAMGATE_LLM_MODEL") {
            config.provider.model = model;
        }
        config.provider.api_key = std::env::var("SPAMGATE_LLM_API_KEY").ok();
        if let Ok(base_url) = std::env::var("SPAMGATE_LLM_BASE_URL") {
            config.provider.base_url = Some(base_url);
        }
        if let Some(timeout) = parse_env("SPAMGATE_LLM_TIMEOUT") {
            config.provider.timeout_seconds = Some(timeout);
        }
        if let Some(temperature) = parse_env("SPAMGATE_LLM_TEMPERATURE") {
            config.provider.temperature = Some(temperature);
        }
        if let Some(retries) = parse_env("SPAMGATE_LLM_MAX_RETRIES") {
            config.provider.max_retries = retries;
        }
        if let Some(ttl) = parse_env("SPAMGATE_CACHE_TTL") {
            config.cache.ttl_seconds = ttl;
        }
        if let Some(capacity) = parse_env("SPAMGATE_CACHE_CAPACITY") {
            config.cache.max_size = capacity;
        }
        if let Ok(enabled) = std::env::var("SPAMGATE_CACHE_ENABLED") {
            config.cache.enabled = enabled == "true";
        }
        if let Some(max_chars) = parse_env("SPAMGATE_MAX_INPUT_CHARS") {
            config.max_input_chars = max_chars;
        }

        Ok(config)
    }

    /// Validate the configuration, accumulating every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.provider.model.trim().is_empty() {
            errors.push("provider model must not be empty".to_string());
        }
        if let Some(temp) = self.provider.temperature {
            if !(0.0..=1.0).contains(&temp) {
                errors.push("temperature must be between 0.0 and 1.0".to_string());
            }
        }
        if let Some(tokens) = self.provider.max_tokens {
            if tokens == 0 {
                errors.push("max_tokens must be greater than 0".to_string());
            }
        }
        if self.provider.provider_type == ProviderType::OpenAi
            && self.provider.api_key.is_none()
        {
            errors.push("OpenAI provider requires an api_key".to_string());
        }
        if self.cache.max_size == 0 {
            errors.push("cache max_size must be greater than 0".to_string());
        }
        if self.cache.ttl_seconds == 0 {
            errors.push("cache ttl_seconds must be greater than 0".to_string());
        }
        if self.max_input_chars == 0 {
            errors.push("max_input_chars must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.provider_type, ProviderType::Stub);
        assert_eq!(config.cache.max_size, 100);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.max_input_chars, 3000);
    }

    #[test]
    fn rejects_zero_input_bound() {
        let mut config = ClassifierConfig::default();
        config.max_input_chars = 0;

        let errors = config.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.contains("max_input_chars")));
    }

    #[test]
    fn validation_accumulates_errors() {
        let mut config = ClassifierConfig::default();
        config.provider.provider_type = ProviderType::OpenAi;
        config.provider.model = "".to_string();
        config.provider.temperature = Some(1.5);
        config.cache.max_size = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    // One test owns all SPAMGATE_* variables; splitting it would race under
    // the parallel test runner.
    #[test]
    fn reads_environment_variables() {
        let vars = [
            "SPAMGATE_LLM_PROVIDER",
            "SPAMGATE_LLM_MODEL",
            "SPAMGATE_LLM_API_KEY",
            "SPAMGATE_LLM_BASE_URL",
            "SPAMGATE_MAX_INPUT_CHARS",
        ];
        for var in vars {
            std::env::remove_var(var);
        }

        std::env::set_var("SPAMGATE_LLM_PROVIDER", "openai");
        std::env::set_var("SPAMGATE_LLM_MODEL", "gpt-4o-mini");
        std::env::set_var("SPAMGATE_LLM_API_KEY", "sk-test");
        std::env::set_var("SPAMGATE_MAX_INPUT_CHARS", "500");
        let config = ClassifierConfig::from_env().unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAi);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.provider.base_url, None);
        assert_eq!(config.max_input_chars, 500);

        // openrouter with no explicit base URL gets the OpenRouter endpoint.
        std::env::set_var("SPAMGATE_LLM_PROVIDER", "openrouter");
        let config = ClassifierConfig::from_env().unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAi);
        assert_eq!(
            config.provider.base_url.as_deref(),
            Some("https://openrouter.ai/api/v1")
        );

        // An explicit base URL wins over the openrouter default.
        std::env::set_var("SPAMGATE_LLM_BASE_URL", "http://localhost:8080/v1");
        let config = ClassifierConfig::from_env().unwrap();
        assert_eq!(
            config.provider.base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );

        std::env::set_var("SPAMGATE_LLM_PROVIDER", "carrier-pigeon");
        let err = ClassifierConfig::from_env().unwrap_err();
        assert!(matches!(err, ClassifierError::Config(_)));

        for var in vars {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn parses_toml_fragment() {
        let toml = r#"
            [provider]
            provider_type = "Stub"
            model = "test-model"
            temperature = 0.2

            [cache]
            enabled = true
            ttl_seconds = 120
            max_size = 10
        "#;
        let config: ClassifierConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.provider.model, "test-model");
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.provider.max_retries, 2);
    }
}
