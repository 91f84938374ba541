//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;
use crate::onboarding::model::{BackgroundCatalog, MAX_OPTIONS};

/// Ollama connection settings.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server, without a trailing slash.
    pub base_url: String,
    /// Model tag passed to `/api/generate`.
    pub model: String,
    /// Per-request timeout. Plan generation routinely takes tens of seconds.
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            request_timeout: Duration::from_secs(180),
        }
    }
}

/// Full service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub ollama: OllamaConfig,
    /// Maximum tokens the model may produce per call (`num_predict`).
    pub num_predict: u32,
    /// HTTP listen port.
    pub port: u16,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Recognized background categories.
    pub backgrounds: BackgroundCatalog,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            num_predict: 4096,
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            backgrounds: BackgroundCatalog::default(),
        }
    }
}

impl PlannerConfig {
    /// Build config from `LEARNING_PLANNER_*` environment variables.
    ///
    /// Unset variables fall back to [`PlannerConfig::default`]; set but
    /// unparseable values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LEARNING_PLANNER_OLLAMA_URL") {
            config.ollama.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("LEARNING_PLANNER_MODEL") {
            config.ollama.model = model.trim().to_string();
        }
        if let Some(secs) = lookup("LEARNING_PLANNER_TIMEOUT_SECS") {
            config.ollama.request_timeout =
                Duration::from_secs(parse_value("LEARNING_PLANNER_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = lookup("LEARNING_PLANNER_NUM_PREDICT") {
            config.num_predict = parse_value("LEARNING_PLANNER_NUM_PREDICT", &n)?;
        }
        if let Some(port) = lookup("LEARNING_PLANNER_PORT") {
            config.port = parse_value("LEARNING_PLANNER_PORT", &port)?;
        }
        if let Some(origins) = lookup("LEARNING_PLANNER_CORS_ORIGINS") {
            config.cors_origins = split_list(&origins);
        }
        if let Some(extra) = lookup("LEARNING_PLANNER_EXTRA_BACKGROUNDS") {
            for name in split_list(&extra) {
                config.backgrounds.add_generic(&name);
            }
            // Step 1 offers every background as an option.
            let count = config.backgrounds.categories().len();
            if count > MAX_OPTIONS {
                return Err(ConfigError::InvalidValue {
                    key: "LEARNING_PLANNER_EXTRA_BACKGROUNDS".to_string(),
                    message: format!("at most {MAX_OPTIONS} backgrounds are supported, got {count}"),
                });
            }
        }

        if config.ollama.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "LEARNING_PLANNER_OLLAMA_URL".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if config.ollama.model.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "LEARNING_PLANNER_MODEL".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
