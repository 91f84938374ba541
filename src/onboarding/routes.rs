//! REST endpoints for the onboarding wizard.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::{ErrorKind, PlannerError};

use super::manager::Planner;
use super::model::{LearningPlan, OnboardingQuestion};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub planner: Arc<Planner>,
}

/// Planner failure rendered as a JSON error response.
///
/// Only a generic message leaves the process; the full error is logged.
#[derive(Debug)]
pub struct ApiError(PlannerError);

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.0.kind() {
            ErrorKind::InvalidInput => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", self.0.to_string())
            }
            ErrorKind::Transport => {
                error!(error = %self.0, "Model service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MODEL_UNAVAILABLE",
                    "The learning model is not available right now. Please try again.".to_string(),
                )
            }
            ErrorKind::Format | ErrorKind::Schema => {
                warn!(error = %self.0, "Model returned an unusable response");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_MODEL_RESPONSE",
                    "The learning model returned an unexpected response. Please try again."
                        .to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwrap a JSON body, turning any rejection into an `InvalidInput` error.
///
/// The rejection text names serde internals, so it is logged and replaced
/// with a list of the expected fields.
fn json_body<T>(body: Result<Json<T>, JsonRejection>, fields: &str) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected request body");
        ApiError(PlannerError::invalid_input(
            "body",
            format!("expected a JSON object with string fields: {fields}"),
        ))
    })
}

#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    pub background: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub background: String,
    pub focus_goal: String,
    pub time: String,
}

/// GET /
async fn root(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(json!({
        "message": "Learning Planner API",
        "llm": "Ollama (local)",
        "model": state.planner.model_name(),
        "endpoints": {
            "step1": "GET /api/onboarding/step1",
            "step2": "POST /api/onboarding/step2",
            "step3": "GET /api/onboarding/step3",
            "generate_plan": "POST /api/onboarding/generate-plan"
        }
    }))
}

/// GET /health
///
/// 200 when the model server answers and has the configured model, 503
/// otherwise.
async fn health(State(state): State<OnboardingRouteState>) -> Response {
    match state.planner.health().await {
        Ok(health) if !health.model_available => {
            warn!(model = %health.model, "Configured model is not installed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "model_missing",
                    "provider": health.provider,
                    "model": health.model,
                    "model_available": false,
                    "version": health.version,
                })),
            )
                .into_response()
        }
        Ok(health) => Json(json!({
            "status": "healthy",
            "provider": health.provider,
            "model": health.model,
            "model_available": health.model_available,
            "version": health.version,
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "model": state.planner.model_name(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/onboarding/step1
async fn background_question(
    State(state): State<OnboardingRouteState>,
) -> ApiResult<OnboardingQuestion> {
    Ok(Json(state.planner.get_background_question().await?))
}

/// POST /api/onboarding/step2
async fn followup_question(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<FollowUpRequest>, JsonRejection>,
) -> ApiResult<OnboardingQuestion> {
    let request = json_body(body, "background")?;
    Ok(Json(
        state
            .planner
            .get_followup_question(&request.background)
            .await?,
    ))
}

/// GET /api/onboarding/step3
async fn time_question(State(state): State<OnboardingRouteState>) -> ApiResult<OnboardingQuestion> {
    Ok(Json(state.planner.get_time_question().await?))
}

/// POST /api/onboarding/generate-plan
async fn generate_plan(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<PlanRequest>, JsonRejection>,
) -> ApiResult<LearningPlan> {
    let request = json_body(body, "background, focus_goal, time")?;
    Ok(Json(
        state
            .planner
            .generate_learning_plan(&request.background, &request.focus_goal, &request.time)
            .await?,
    ))
}

/// CORS for the given origins. Origins that are not valid header values are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/onboarding/step1", get(background_question))
        .route("/api/onboarding/step2", post(followup_question))
        .route("/api/onboarding/step3", get(time_question))
        .route("/api/onboarding/generate-plan", post(generate_plan))
        .with_state(state)
}

/// The onboarding routes with CORS and request tracing applied.
pub fn app(state: OnboardingRouteState, cors_origins: &[String]) -> Router {
    onboarding_routes(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(cors_origins)),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::error::LlmError;
    use crate::onboarding::validate::SchemaViolation;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request_with_reason() {
        let response =
            ApiError(PlannerError::invalid_input("background", "unknown background")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body["error"].as_str().unwrap().contains("unknown background"));
    }

    #[tokio::test]
    async fn transport_hides_details() {
        let response = ApiError(PlannerError::Transport(LlmError::Unreachable {
            provider: "ollama".into(),
            url: "http://10.0.0.5:11434/api/generate".into(),
            reason: "connection refused".into(),
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "MODEL_UNAVAILABLE");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn bad_model_output_hides_raw_text() {
        for err in [
            PlannerError::Format {
                reason: "expected value".into(),
                raw: "secret raw text".into(),
            },
            PlannerError::Schema {
                schema: "LearningPlan",
                violations: vec![SchemaViolation::MissingDay { day: 7 }],
            },
        ] {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
            let body = body_json(response).await;
            assert_eq!(body["code"], "BAD_MODEL_RESPONSE");
            assert!(!body.to_string().contains("secret raw text"));
            assert!(!body.to_string().contains("day 7"));
        }
    }

    #[test]
    fn cors_layer_skips_invalid_origins() {
        // Construction must not panic on a bad origin.
        let _ = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
