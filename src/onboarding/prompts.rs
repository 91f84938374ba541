//! Prompt text for each onboarding step.
//!
//! All builders are pure: the same inputs always produce the same text, so a
//! caller may cache results keyed on the arguments.

use crate::error::PlannerError;

use super::model::{
    BackgroundCatalog, BackgroundCategory, FollowUpExample, PLAN_DAYS, SchemaKind,
};
use super::state::OnboardingStep;

/// System prompt sent with every request.
pub const SYSTEM_PROMPT: &str = "\
You are a structured learning plan generator. You do NOT engage in conversation.

Output ONLY valid JSON. No markdown, no explanations, no text outside JSON.

Follow the exact schema provided in each request.";

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// A built prompt and the schema its response is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPrompt {
    pub step: OnboardingStep,
    pub text: String,
    pub schema: SchemaKind,
}

/// Trimmed, non-blank text or an `InvalidInput` error naming the field.
pub fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, PlannerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::invalid_input(field, "must not be empty"));
    }
    Ok(trimmed)
}

/// Resolve a background name against the catalog.
pub fn resolve_background<'a>(
    catalog: &'a BackgroundCatalog,
    background: &str,
) -> Result<&'a BackgroundCategory, PlannerError> {
    let name = require_text("background", background)?;
    catalog.resolve(name).ok_or_else(|| {
        PlannerError::invalid_input(
            "background",
            format!(
                "{name:?} is not a recognized background (expected one of: {})",
                catalog.names().join(", ")
            ),
        )
    })
}

fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| quoted(s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn question_schema(id: &str, text: &str, options: &str) -> String {
    format!(
        "{{\n  \"question_id\": {id},\n  \"question_text\": {text},\n  \"options\": [{options}]\n}}"
    )
}

fn example_schema(example: &FollowUpExample) -> String {
    question_schema(
        &quoted(&example.question_id),
        &quoted(&example.question_text),
        &quoted_list(&example.options),
    )
}

/// Step 1: the background question.
pub fn build_step1_prompt(catalog: &BackgroundCatalog) -> StepPrompt {
    let names: Vec<String> = catalog.names().into_iter().map(String::from).collect();
    let schema = question_schema(
        &quoted("background"),
        &quoted("What's your background?"),
        &quoted_list(&names),
    );

    StepPrompt {
        step: OnboardingStep::Background,
        text: format!(
            "Generate the initial onboarding question.\n\n\
             Output schema:\n{schema}\n\n\
             Return JSON only."
        ),
        schema: SchemaKind::OnboardingQuestion,
    }
}

/// Step 2: a follow-up question tailored to the user's background.
pub fn build_step2_prompt(
    catalog: &BackgroundCatalog,
    background: &str,
) -> Result<StepPrompt, PlannerError> {
    let category = resolve_background(catalog, background)?;

    let mut text = format!(
        "User background: {name}\n\n\
         Generate the next question to understand {hint}.\n",
        name = category.name,
        hint = category.focus_hint,
    );

    if category.forbid_catch_all {
        text.push_str(
            "\nIMPORTANT: Do NOT include \"Others\" or \"Please specify\" options. \
             Only include specific, clear choices.\n",
        );
    }

    let generic = question_schema(
        &quoted("string"),
        &quoted("string"),
        "\"option1\", \"option2\", ...",
    );
    text.push_str(&format!("\nOutput schema:\n{generic}\n"));

    if let Some(example) = &category.example {
        text.push_str(&format!(
            "\nExample for this background:\n{}\n",
            example_schema(example)
        ));
    }

    text.push_str("\nReturn JSON only.");

    Ok(StepPrompt {
        step: OnboardingStep::Focus,
        text,
        schema: SchemaKind::OnboardingQuestion,
    })
}

/// Step 3: the daily time commitment question.
pub fn build_step3_prompt() -> StepPrompt {
    let schema = question_schema(
        &quoted("time_commitment"),
        &quoted("How much time can you spend daily?"),
        "\"5 minutes\", \"10 minutes\", \"20 minutes\"",
    );

    StepPrompt {
        step: OnboardingStep::Time,
        text: format!(
            "Generate the time commitment question.\n\n\
             Output schema:\n{schema}\n\n\
             Return JSON only."
        ),
        schema: SchemaKind::OnboardingQuestion,
    }
}

/// Step 4: the seven-day learning plan.
///
/// The model has no structural enforcement of its own, so every constraint
/// the validator checks is spelled out in the instructions.
pub fn build_step4_prompt(
    background: &str,
    focus_goal: &str,
    time: &str,
) -> Result<StepPrompt, PlannerError> {
    let background = require_text("background", background)?;
    let focus_goal = require_text("focus_goal", focus_goal)?;
    let time = require_text("time", time)?;
    let time_json = quoted(time);

    let days = (1..=PLAN_DAYS)
        .map(|day| {
            format!(
                "    {{\n      \"day\": {day},\n      \"title\": \"Day {day} Title\",\n      \
                 \"what_to_learn\": \"Brief explanation of the concept\",\n      \
                 \"what_to_do\": \"Specific actionable task\",\n      \
                 \"time_required\": {time_json}\n    }}"
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let text = format!(
        "Create a {PLAN_DAYS}-day AI learning plan for this user:\n\
         - Background: {background}\n\
         - Focus/Goal: {focus_goal}\n\
         - Time per day: {time}\n\n\
         CRITICAL: You MUST generate EXACTLY {PLAN_DAYS} days (day 1 through day {PLAN_DAYS}), \
         one task per day. No more, no less.\n\n\
         Requirements for each day:\n\
         - Beginner-friendly explanations\n\
         - Tasks that fit within {time}\n\
         - Actionable exercises\n\
         - \"time_required\" states the time in minutes\n\n\
         Output MUST be valid JSON with this EXACT structure:\n\
         {{\n  \"plan\": [\n{days}\n  ]\n}}\n\n\
         Return ONLY the JSON. No explanations. ALL {PLAN_DAYS} days required."
    );

    Ok(StepPrompt {
        step: OnboardingStep::Plan,
        text,
        schema: SchemaKind::LearningPlan,
    })
}
