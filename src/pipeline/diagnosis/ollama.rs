use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::{GenerationOptions, LlmClient};
use super::EngineError;
use crate::config::EngineConfig;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client pointing at an Ollama instance. Every request is
    /// bounded by `timeout_secs`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, EngineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EngineError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_connect() {
            EngineError::Transport(format!("Ollama is not running at {}", self.base_url))
        } else if e.is_timeout() {
            EngineError::Transport(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            EngineError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

impl<'a> OllamaGenerateRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, system: &'a str, options: &GenerationOptions) -> Self {
        Self {
            model,
            prompt,
            system,
            stream: false,
            format: options.structured_output.then_some("json"),
            options: OllamaOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                num_predict: options.max_tokens,
            },
        }
    }
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, EngineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest::new(model, prompt, system, options);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::ModelStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| EngineError::HttpClient(e.to_string()))?;

        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, EngineError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, EngineError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::ModelStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| EngineError::HttpClient(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Mock LLM client for testing. Returns a configurable response and keeps
/// the prompts it was given.
pub struct MockLlmClient {
    response: String,
    available_models: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            available_models: vec!["medgemma:latest".to_string()],
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: &str,
        _options: &GenerationOptions,
    ) -> Result<String, EngineError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.response.clone())
    }

    fn is_model_available(&self, model: &str) -> Result<bool, EngineError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.available_models.clone())
    }
}
