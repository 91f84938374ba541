//! Onboarding: four generated steps that end in a seven-day learning plan.
//!
//! Steps 1 to 3 each ask the model for a multiple-choice question; step 4
//! asks for the plan itself. Every model reply goes through the same
//! normalizer and is checked against the step's schema before it reaches
//! a caller.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod state;
pub mod validate;

pub use manager::{Planner, PlannerSettings};
pub use model::{BackgroundCatalog, BackgroundCategory, LearningPlan, LearningTask, OnboardingQuestion};
pub use routes::{OnboardingRouteState, app, onboarding_routes};
pub use state::{OnboardingFlow, OnboardingStep, SessionAnswers};
pub use validate::{ResponseError, SchemaViolation, StepSchema};
