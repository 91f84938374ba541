//! Ollama backend over its HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::LlmError;

use super::provider::{GenerateRequest, GenerateResponse, LlmProvider, ProviderHealth};

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
    #[serde(default)]
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaVersion {
    version: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// Talks to a local Ollama server via `/api/generate`, always requesting
/// non-streamed JSON-formatted output.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                provider: PROVIDER.to_string(),
                timeout: self.timeout,
            }
        } else if err.is_connect() {
            LlmError::Unreachable {
                provider: PROVIDER.to_string(),
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: err.to_string(),
            }
        } else {
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Map a non-2xx reply. Only `/api/generate` answers 404 for an unknown
    /// model; anywhere else a 404 means the base URL is wrong.
    async fn status_error(&self, response: reqwest::Response, names_model: bool) -> LlmError {
        let status = response.status();
        if names_model && status == reqwest::StatusCode::NOT_FOUND {
            return LlmError::ModelNotAvailable {
                provider: PROVIDER.to_string(),
                model: self.model.clone(),
            };
        }
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(200).collect();
        LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {status}: {body}"),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, LlmError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        if !response.status().is_success() {
            return Err(self.status_error(response, false).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| self.transport_error(&url, e))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = self.url("/api/generate");
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.num_predict,
            },
        };

        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Sending generate request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        if !response.status().is_success() {
            let err = self.status_error(response, true).await;
            warn!(error = %err, "Ollama generate failed");
            return Err(err);
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        Ok(GenerateResponse {
            content: parsed.response,
            input_tokens: parsed.prompt_eval_count,
            output_tokens: parsed.eval_count,
            done_reason: parsed.done_reason,
        })
    }

    async fn health_check(&self) -> Result<ProviderHealth, LlmError> {
        let version: OllamaVersion = self.get_json("/api/version").await?;
        let tags: OllamaTags = self.get_json("/api/tags").await?;

        let model_available = tags
            .models
            .iter()
            .any(|m| model_matches(&m.name, &self.model));

        Ok(ProviderHealth {
            provider: PROVIDER.to_string(),
            model: self.model.clone(),
            version: Some(version.version),
            model_available,
        })
    }
}

/// `llama3.2` matches an installed `llama3.2:latest`; an explicit tag must match exactly.
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || (!wanted.contains(':')
            && installed
                .strip_prefix(wanted)
                .is_some_and(|rest| rest.starts_with(':')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_matching() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2:3b", "llama3.2:3b"));
        assert!(!model_matches("llama3.2:3b", "llama3.2:1b"));
        assert!(!model_matches("llama3.1:latest", "llama3"));
        assert!(!model_matches("mistral:latest", "llama3.2"));
    }

    #[test]
    fn request_body_shape() {
        let body = OllamaGenerateRequest {
            model: "llama3.2",
            prompt: "Generate",
            system: None,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: Some(4096),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 4096);
        assert!(json.get("system").is_none());
    }

    #[test]
    fn trailing_slash_trimmed() {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
        assert_eq!(provider.model_name(), "llama3.2");
    }
}
