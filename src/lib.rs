//! Learning planner: LLM-driven onboarding that produces a seven-day AI learning plan.

pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
