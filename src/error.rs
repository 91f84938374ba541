//! Error types for the learning planner.

use std::time::Duration;

use crate::onboarding::validate::{ResponseError, SchemaViolation};

/// Top-level error type for the service binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inference transport errors.
///
/// Every variant is a transport failure from the planner's point of view:
/// the model never produced text the planner could inspect.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Could not connect to {provider} at {url}: {reason}")]
    Unreachable {
        provider: String,
        url: String,
        reason: String,
    },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Classification of a planner failure, used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Transport,
    Format,
    Schema,
}

/// Errors surfaced by the onboarding planner.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] LlmError),

    #[error("Could not parse model output as JSON: {reason}")]
    Format { reason: String, raw: String },

    #[error("Model output violates the {schema} schema: {}", join_violations(.violations))]
    Schema {
        schema: &'static str,
        violations: Vec<SchemaViolation>,
    },
}

impl PlannerError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Format { .. } => ErrorKind::Format,
            Self::Schema { .. } => ErrorKind::Schema,
        }
    }
}

impl From<ResponseError> for PlannerError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Format { reason, raw } => Self::Format { reason, raw },
            ResponseError::Schema { schema, violations } => Self::Schema { schema, violations },
        }
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for the service binary.
pub type Result<T> = std::result::Result<T, Error>;
