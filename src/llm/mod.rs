//! LLM integration for the learning planner.
//!
//! The planner only sees the [`LlmProvider`] trait. The one concrete backend
//! is a locally hosted Ollama server, reached over HTTP with `reqwest`.

pub mod ollama;
pub mod provider;

pub use ollama::OllamaProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::OllamaConfig;
use crate::error::LlmError;

/// Create an LLM provider from configuration.
pub fn create_provider(config: &OllamaConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OllamaProvider::new(config)?;
    tracing::info!(
        "Using Ollama at {} (model: {})",
        provider.base_url(),
        config.model
    );
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_does_not_connect() {
        // Nothing listens here; construction must still succeed.
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "qwen2.5".to_string(),
            ..OllamaConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "qwen2.5");
    }
}
