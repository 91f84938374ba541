//! The inference capability the planner depends on.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LlmError;

/// A single-prompt generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    /// Upper bound on generated tokens, if the backend supports one.
    pub num_predict: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.0,
            num_predict: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_num_predict(mut self, num_predict: u32) -> Self {
        self.num_predict = Some(num_predict);
        self
    }
}

/// Raw text returned by the model, plus whatever accounting the backend gives.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Backend-reported stop reason, e.g. `"stop"` or `"length"`.
    pub done_reason: Option<String>,
}

/// Result of probing the backend.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether the configured model is installed on the backend.
    pub model_available: bool,
}

/// A text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier used for requests.
    fn model_name(&self) -> &str;

    /// Generate text for a prompt. Fails only for transport-level problems;
    /// whatever text comes back is returned untouched.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<ProviderHealth, LlmError>;
}
