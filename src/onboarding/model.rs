//! Onboarding questions, learning plans, and the background catalog.

use serde::{Deserialize, Serialize};

/// Number of days in every learning plan.
pub const PLAN_DAYS: u8 = 7;

/// Bounds on the number of answer options in a question.
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// A multiple-choice question shown during steps 1–3.
///
/// Only constructed by the validator, so every instance satisfies the
/// option-count and non-empty invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingQuestion {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<String>,
}

/// One day of a learning plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningTask {
    pub day: u8,
    pub title: String,
    pub what_to_learn: String,
    pub what_to_do: String,
    pub time_required: String,
}

/// A seven-day learning plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub plan: Vec<LearningTask>,
}

/// The shape a step's response must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    OnboardingQuestion,
    LearningPlan,
}

/// An example follow-up question embedded into the step-2 prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpExample {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<String>,
}

/// A recognized user background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCategory {
    /// Canonical name, as shown in the step-1 options.
    pub name: String,
    /// What the follow-up question should uncover, e.g. "their technical role".
    pub focus_hint: String,
    /// Example question pinned into the prompt, if any.
    pub example: Option<FollowUpExample>,
    /// Forbid catch-all options such as "Others" in the follow-up.
    pub forbid_catch_all: bool,
}

impl BackgroundCategory {
    fn new(name: &str, focus_hint: &str, example: Option<FollowUpExample>) -> Self {
        Self {
            name: name.to_string(),
            focus_hint: focus_hint.to_string(),
            example,
            forbid_catch_all: false,
        }
    }
}

fn example(id: &str, text: &str, options: &[&str]) -> Option<FollowUpExample> {
    Some(FollowUpExample {
        question_id: id.to_string(),
        question_text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
    })
}

/// The set of backgrounds the follow-up step accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCatalog {
    categories: Vec<BackgroundCategory>,
}

impl Default for BackgroundCatalog {
    fn default() -> Self {
        let mut non_tech = BackgroundCategory::new(
            "Non-tech",
            "why they want to learn AI",
            example(
                "nontech_goal",
                "Why do you want to learn AI?",
                &[
                    "Career growth",
                    "Curiosity",
                    "Work efficiency",
                    "Business idea",
                    "Personal development",
                    "Stay current with technology",
                ],
            ),
        );
        non_tech.forbid_catch_all = true;

        Self {
            categories: vec![
                BackgroundCategory::new(
                    "Tech",
                    "their technical role",
                    example(
                        "tech_focus",
                        "What best describes your role?",
                        &["Backend", "Frontend", "Data", "Mobile", "DevOps", "Student"],
                    ),
                ),
                BackgroundCategory::new(
                    "Product",
                    "their product focus",
                    example(
                        "product_focus",
                        "What area are you focused on?",
                        &[
                            "Product Management",
                            "Product Design",
                            "Product Strategy",
                            "Product Analytics",
                        ],
                    ),
                ),
                BackgroundCategory::new(
                    "Design",
                    "their design discipline",
                    example(
                        "design_focus",
                        "What's your design discipline?",
                        &["UI/UX", "Visual Design", "Design Research", "Prototyping"],
                    ),
                ),
                non_tech,
            ],
        }
    }
}

impl BackgroundCatalog {
    /// Find a category by name, ignoring case and surrounding whitespace.
    pub fn resolve(&self, name: &str) -> Option<&BackgroundCategory> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Add a category with a generic hint. No-op if it already exists.
    pub fn add_generic(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || self.resolve(name).is_some() {
            return;
        }
        self.categories.push(BackgroundCategory::new(
            name,
            "what they want to achieve with AI in their field",
            None,
        ));
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn categories(&self) -> &[BackgroundCategory] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(day: u8) -> LearningTask {
        LearningTask {
            day,
            title: format!("Day {day}"),
            what_to_learn: "Prompting basics".into(),
            what_to_do: "Write three prompts".into(),
            time_required: "10 minutes".into(),
        }
    }

    #[test]
    fn resolve_is_case_insensitive_and_canonical() {
        let catalog = BackgroundCatalog::default();
        assert_eq!(catalog.resolve("tech").unwrap().name, "Tech");
        assert_eq!(catalog.resolve("  NON-TECH ").unwrap().name, "Non-tech");
        assert!(catalog.resolve("Astrologer").is_none());
        assert!(catalog.resolve("").is_none());
    }

    #[test]
    fn default_examples_fit_option_bounds() {
        for category in BackgroundCatalog::default().categories() {
            let example = category.example.as_ref().unwrap();
            assert!(
                (MIN_OPTIONS..=MAX_OPTIONS).contains(&example.options.len()),
                "{} example has {} options",
                category.name,
                example.options.len()
            );
        }
    }

    #[test]
    fn add_generic_skips_duplicates() {
        let mut catalog = BackgroundCatalog::default();
        catalog.add_generic("design");
        catalog.add_generic("Marketing");
        catalog.add_generic(" ");
        assert_eq!(
            catalog.names(),
            vec!["Tech", "Product", "Design", "Non-tech", "Marketing"]
        );
        assert!(catalog.resolve("marketing").unwrap().example.is_none());
    }

    #[test]
    fn plan_serializes_with_wire_names() {
        let plan = LearningPlan {
            plan: vec![task(1)],
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["plan"][0]["what_to_learn"], "Prompting basics");
        assert_eq!(json["plan"][0]["time_required"], "10 minutes");
    }
}
