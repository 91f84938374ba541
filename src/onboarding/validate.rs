//! Turns raw model output into validated onboarding values.
//!
//! Every call runs one pass through the same stages:
//!
//! 1. **raw text**: exactly what the model returned.
//! 2. **stripped**: [`trim`], then [`strip_fences`], then [`extract_object`].
//! 3. **parsed**: the candidate is parsed as JSON. A syntax error ends the
//!    pass with [`ResponseError::Format`], carrying the original raw text.
//! 4. **validated**: the parsed value is checked by a [`StepSchema`]. Any
//!    violation ends the pass with [`ResponseError::Schema`], listing every
//!    constraint that failed, not just the first.
//! 5. **accepted**: the typed value is returned.
//!
//! Nothing is ever defaulted or coerced. A day of `"3"` is a type error, not
//! day three.

use serde_json::{Map, Value};

use super::model::{
    LearningPlan, LearningTask, MAX_OPTIONS, MIN_OPTIONS, OnboardingQuestion, PLAN_DAYS,
    SchemaKind,
};

/// A single violated schema constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    NotAnObject,
    MissingField { path: String },
    WrongType { path: String, expected: &'static str },
    EmptyField { path: String },
    OptionCount { count: usize },
    PlanLength { count: usize },
    DayOutOfRange { path: String, day: i64 },
    DuplicateDay { day: u8 },
    MissingDay { day: u8 },
    TimeUnitMissing { path: String, value: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "expected a JSON object"),
            Self::MissingField { path } => write!(f, "{path} missing"),
            Self::WrongType { path, expected } => write!(f, "{path} must be {expected}"),
            Self::EmptyField { path } => write!(f, "{path} is empty"),
            Self::OptionCount { count } => write!(
                f,
                "options must have {MIN_OPTIONS}-{MAX_OPTIONS} entries, got {count}"
            ),
            Self::PlanLength { count } => write!(f, "expected {PLAN_DAYS} tasks, got {count}"),
            Self::DayOutOfRange { path, day } => {
                write!(f, "{path} is {day}, outside 1-{PLAN_DAYS}")
            }
            Self::DuplicateDay { day } => write!(f, "day {day} appears more than once"),
            Self::MissingDay { day } => write!(f, "day {day} missing"),
            Self::TimeUnitMissing { path, value } => {
                write!(f, "{path} lacks unit: {value:?} does not mention minutes")
            }
        }
    }
}

/// Why a model response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("unparseable model output: {reason}")]
    Format { reason: String, raw: String },

    #[error("{schema} schema violated ({} constraints)", .violations.len())]
    Schema {
        schema: &'static str,
        violations: Vec<SchemaViolation>,
    },
}

/// A response shape the validator knows how to check.
pub trait StepSchema: Sized {
    /// Schema name used in errors and logs.
    const NAME: &'static str;

    /// Descriptor a prompt must carry for its reply to be checked by this schema.
    const KIND: SchemaKind;

    /// Build the value, or report every violated constraint.
    fn from_value(value: &Value) -> Result<Self, Vec<SchemaViolation>>;
}

// ── Normalization ───────────────────────────────────────────────────────

pub fn trim(text: &str) -> &str {
    text.trim()
}

/// Remove a leading triple-backtick fence (with its language tag) and a
/// trailing fence. Text that does not start with a fence is returned as is.
pub fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let tag_end = rest
        .find(|c: char| c.is_whitespace() || c == '{' || c == '[')
        .unwrap_or(rest.len());
    let body = rest[tag_end..].trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Slice from the first `{` to the last `}` when both exist in that order.
pub fn extract_object(text: &str) -> &str {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}'))
        && end > start
    {
        return &text[start..=end];
    }
    text
}

/// Run the full normalization sequence, yielding the parse candidate.
pub fn normalize(raw: &str) -> &str {
    extract_object(strip_fences(trim(raw)))
}

/// Normalize and parse, without any schema check.
pub fn parse_candidate(raw: &str) -> Result<Value, ResponseError> {
    let candidate = normalize(raw);
    serde_json::from_str(candidate).map_err(|e| ResponseError::Format {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}

/// Normalize, parse and validate a raw model response.
pub fn accept<S: StepSchema>(raw: &str) -> Result<S, ResponseError> {
    let value = parse_candidate(raw)?;
    S::from_value(&value).map_err(|violations| ResponseError::Schema {
        schema: S::NAME,
        violations,
    })
}

// ── Field checks ────────────────────────────────────────────────────────

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Read a required, non-blank string field.
fn text_field(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<String> {
    let path = join_path(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => {
            violations.push(SchemaViolation::MissingField { path });
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            violations.push(SchemaViolation::EmptyField { path });
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(SchemaViolation::WrongType {
                path,
                expected: "a string",
            });
            None
        }
    }
}

/// Read a required array field.
fn array_field<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<&'a Vec<Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => {
            violations.push(SchemaViolation::MissingField {
                path: key.to_string(),
            });
            None
        }
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            violations.push(SchemaViolation::WrongType {
                path: key.to_string(),
                expected: "an array",
            });
            None
        }
    }
}

fn mentions_minutes(value: &str) -> bool {
    value.to_lowercase().contains("minute")
}

// ── Schemas ─────────────────────────────────────────────────────────────

impl StepSchema for OnboardingQuestion {
    const NAME: &'static str = "OnboardingQuestion";
    const KIND: SchemaKind = SchemaKind::OnboardingQuestion;

    fn from_value(value: &Value) -> Result<Self, Vec<SchemaViolation>> {
        let Some(obj) = value.as_object() else {
            return Err(vec![SchemaViolation::NotAnObject]);
        };
        let mut violations = Vec::new();

        let question_id = text_field(obj, "", "question_id", &mut violations);
        let question_text = text_field(obj, "", "question_text", &mut violations);

        let mut options = Vec::new();
        if let Some(items) = array_field(obj, "options", &mut violations) {
            for (i, item) in items.iter().enumerate() {
                let path = format!("options[{i}]");
                match item {
                    Value::String(s) if s.trim().is_empty() => {
                        violations.push(SchemaViolation::EmptyField { path })
                    }
                    Value::String(s) => options.push(s.clone()),
                    _ => violations.push(SchemaViolation::WrongType {
                        path,
                        expected: "a string",
                    }),
                }
            }
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&items.len()) {
                violations.push(SchemaViolation::OptionCount { count: items.len() });
            }
        }

        match (question_id, question_text) {
            (Some(question_id), Some(question_text)) if violations.is_empty() => {
                Ok(OnboardingQuestion {
                    question_id,
                    question_text,
                    options,
                })
            }
            _ => Err(violations),
        }
    }
}

fn task_from_value(
    index: usize,
    value: &Value,
    violations: &mut Vec<SchemaViolation>,
) -> Option<LearningTask> {
    let prefix = format!("plan[{index}]");
    let Some(obj) = value.as_object() else {
        violations.push(SchemaViolation::WrongType {
            path: prefix,
            expected: "an object",
        });
        return None;
    };

    let day_path = join_path(&prefix, "day");
    let day = match obj.get("day") {
        None | Some(Value::Null) => {
            violations.push(SchemaViolation::MissingField { path: day_path });
            None
        }
        Some(v) => match v.as_i64() {
            Some(d) if (1..=i64::from(PLAN_DAYS)).contains(&d) => u8::try_from(d).ok(),
            Some(d) => {
                violations.push(SchemaViolation::DayOutOfRange {
                    path: day_path,
                    day: d,
                });
                None
            }
            None => {
                violations.push(SchemaViolation::WrongType {
                    path: day_path,
                    expected: "an integer",
                });
                None
            }
        },
    };

    let title = text_field(obj, &prefix, "title", violations);
    let what_to_learn = text_field(obj, &prefix, "what_to_learn", violations);
    let what_to_do = text_field(obj, &prefix, "what_to_do", violations);
    let time_required = text_field(obj, &prefix, "time_required", violations);

    if let Some(time) = &time_required
        && !mentions_minutes(time)
    {
        violations.push(SchemaViolation::TimeUnitMissing {
            path: join_path(&prefix, "time_required"),
            value: time.clone(),
        });
        return None;
    }

    Some(LearningTask {
        day: day?,
        title: title?,
        what_to_learn: what_to_learn?,
        what_to_do: what_to_do?,
        time_required: time_required?,
    })
}

impl StepSchema for LearningPlan {
    const NAME: &'static str = "LearningPlan";
    const KIND: SchemaKind = SchemaKind::LearningPlan;

    fn from_value(value: &Value) -> Result<Self, Vec<SchemaViolation>> {
        let Some(obj) = value.as_object() else {
            return Err(vec![SchemaViolation::NotAnObject]);
        };
        let mut violations = Vec::new();
        let Some(items) = array_field(obj, "plan", &mut violations) else {
            return Err(violations);
        };

        if items.len() != usize::from(PLAN_DAYS) {
            violations.push(SchemaViolation::PlanLength { count: items.len() });
        }

        let mut tasks = Vec::with_capacity(items.len());
        let mut day_counts = [0usize; PLAN_DAYS as usize + 1];
        for (i, item) in items.iter().enumerate() {
            if let Some(day) = item.get("day").and_then(Value::as_i64)
                && (1..=i64::from(PLAN_DAYS)).contains(&day)
            {
                day_counts[day as usize] += 1;
            }
            if let Some(task) = task_from_value(i, item, &mut violations) {
                tasks.push(task);
            }
        }

        for day in 1..=PLAN_DAYS {
            match day_counts[usize::from(day)] {
                0 => violations.push(SchemaViolation::MissingDay { day }),
                1 => {}
                _ => violations.push(SchemaViolation::DuplicateDay { day }),
            }
        }

        if violations.is_empty() {
            Ok(LearningPlan { plan: tasks })
        } else {
            Err(violations)
        }
    }
}
