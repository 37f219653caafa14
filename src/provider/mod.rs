//! Oracle provider abstraction.
//!
//! A provider performs one operation: turn a prompt into a raw completion
//! string. Its output is untrusted; parsing and repair happen at the
//! strategy boundary. Two implementations are provided: an OpenAI-compatible
//! HTTP provider (works with OpenAI and OpenRouter endpoints) and a
//! deterministic stub for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ProviderConfig, ProviderType};
use crate::errors::ClassifierError;

/// Information about an oracle provider.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

/// Abstract interface for oracle calls.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion. May fail transiently (timeout, transport error,
    /// rate limit) or return a malformed body; both are expected and
    /// handled by the caller.
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;

    fn info(&self) -> ProviderInfo;
}

/// Creates providers from configuration.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ClassifierError> {
        match config.provider_type {
            ProviderType::Stub => Ok(Arc::new(StubProvider::new())),
            ProviderType::OpenAi => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completions provider.
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.timeout_seconds.unwrap_or(30),
            ))
            .build()
            .map_err(|e| {
                ClassifierError::Config(format!("failed to create HTTP client: {}", e))
            })?;
        info!(model = %config.model, "created OpenAI-compatible provider");
        Ok(Self { config, client })
    }

    async fn request_once(&self, prompt: &str) -> Result<String, ClassifierError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            ClassifierError::Config("API key required for OpenAI provider".to_string())
        })?;

        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1");
        let url = format!("{}/chat/completions", base_url);

        let request_body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ClassifierError::Provider(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Provider(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ClassifierError::MalformedResponse(format!("completion body: {}", e))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("completion had no choices".to_string())
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.request_once(prompt).await {
                Ok(body) => return Ok(body),
                Err(e @ ClassifierError::Provider(_)) => {
                    warn!(attempt, error = %e, "oracle call failed");
                    last_error = Some(e);
                }
                // Config and parse failures are not transient; retrying
                // the same request cannot fix them.
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| ClassifierError::Provider("oracle call failed".to_string())))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "openai".to_string(),
            model: self.config.model.clone(),
        }
    }
}

/// Scripted behavior for one stub completion.
#[derive(Debug, Clone)]
pub enum StubScript {
    Respond(String),
    Fail(String),
}

/// Deterministic provider for tests and offline runs.
///
/// Responses can be scripted in FIFO order; when the script queue is empty,
/// the stub falls back to a keyword heuristic over the prompt so unscripted
/// use still produces plausible verdict JSON.
pub struct StubProvider {
    script: Mutex<VecDeque<StubScript>>,
    calls: AtomicU64,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Queue a scripted response or failure for the next call.
    pub fn push_script(&self, script: StubScript) {
        self.script
            .lock()
            .expect("stub script lock poisoned")
            .push_back(script);
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn heuristic_response(prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        let spammy = ["free money", "act now", "you have won", "wire transfer", "click here"]
            .iter()
            .any(|kw| lower.contains(kw));
        if spammy {
            r#"{"is_spam": true, "reason": "matches known spam phrasing", "confidence": 0.9, "threat_level": "MEDIUM"}"#.to_string()
        } else {
            r#"{"is_spam": false, "reason": "no spam indicators found", "confidence": 0.8, "threat_level": "LOW"}"#.to_string()
        }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let scripted = self
            .script
            .lock()
            .expect("stub script lock poisoned")
            .pop_front();
        match scripted {
            Some(StubScript::Respond(body)) => Ok(body),
            Some(StubScript::Fail(reason)) => Err(ClassifierError::Provider(reason)),
            None => Ok(Self::heuristic_response(prompt)),
        }
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "stub".to_string(),
            model: "stub-model".to_string(),
        }
    }
}
