//! AI backend abstraction.
//!
//! Supports:
//! - Local: Ollama (default)
//! - Offline: no model; every request fails and callers use their fallback

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AgentError;

/// AI backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend")]
pub enum AiBackendConfig {
    /// Local Ollama instance
    #[serde(rename = "ollama")]
    Ollama {
        base_url: String,
        model: String,
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
        #[serde(default)]
        temperature: Option<f32>,
    },

    /// No model available
    #[serde(rename = "offline")]
    Offline,
}

fn default_timeout() -> u64 {
    120
}

impl Default for AiBackendConfig {
    fn default() -> Self {
        AiBackendConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_seconds: default_timeout(),
            temperature: None,
        }
    }
}

/// A plan generation request as sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPrompt {
    pub system: String,
    pub prompt: String,
}

impl PlanPrompt {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Trait for AI backends.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Ask for a workout plan; returns the raw model text.
    async fn generate_plan(&self, prompt: &PlanPrompt) -> Result<String, AgentError>;

    /// Check if the backend is available.
    async fn health_check(&self) -> Result<bool, AgentError>;
}

/// Build the backend named by the config.
pub fn create_backend(config: &AiBackendConfig) -> Result<Box<dyn AiBackend>, AgentError> {
    match config {
        AiBackendConfig::Ollama { .. } => Ok(Box::new(OllamaBackend::from_config(config)?)),
        AiBackendConfig::Offline => Ok(Box::new(OfflineBackend)),
    }
}

/// Ollama backend implementation.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_seconds: u64,
    temperature: Option<f32>,
}

impl OllamaBackend {
    pub fn new(base_url: String, model: String, timeout_seconds: u64) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AgentError::BackendUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_seconds,
            temperature: None,
        })
    }

    pub fn from_config(config: &AiBackendConfig) -> Result<Self, AgentError> {
        match config {
            AiBackendConfig::Ollama {
                base_url,
                model,
                timeout_seconds,
                temperature,
            } => {
                let mut backend = Self::new(base_url.clone(), model.clone(), *timeout_seconds)?;
                backend.temperature = *temperature;
                Ok(backend)
            }
            AiBackendConfig::Offline => Err(AgentError::BackendUnavailable(
                "config does not name an Ollama backend".to_string(),
            )),
        }
    }
}

/// Ollama `/api/generate` request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Default)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Ollama `/api/generate` response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[async_trait]
impl AiBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate_plan(&self, prompt: &PlanPrompt) -> Result<String, AgentError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: &prompt.prompt,
            system: &prompt.system,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        debug!("Sending request to Ollama: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout_seconds)
                } else {
                    AgentError::BackendUnavailable(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let wait_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            return Err(AgentError::RateLimited(wait_secs));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::BackendUnavailable(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ResponseParseError(e.to_string()))?;

        debug!(
            model = %ollama_response.model,
            prompt_tokens = ?ollama_response.prompt_eval_count,
            completion_tokens = ?ollama_response.eval_count,
            "Ollama response received"
        );

        Ok(ollama_response.response)
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Backend with no model behind it.
pub struct OfflineBackend;

#[async_trait]
impl AiBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn generate_plan(&self, _prompt: &PlanPrompt) -> Result<String, AgentError> {
        Err(AgentError::BackendUnavailable(
            "offline backend configured".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(false)
    }
}

/// Scripted backend for tests: replays queued results, then fails.
#[cfg(test)]
pub struct MockBackend {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, AgentError>>>,
    calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(responses: Vec<Result<String, AgentError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl AiBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate_plan(&self, _prompt: &PlanPrompt) -> Result<String, AgentError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::BackendUnavailable("mock exhausted".to_string())))
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(true)
    }
}
