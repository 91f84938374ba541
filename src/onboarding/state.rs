//! Onboarding state machine: which step a flow is on and what it has collected.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PlannerError;

use super::manager::Planner;
use super::model::{LearningPlan, OnboardingQuestion};
use super::prompts::{require_text, resolve_background};

/// The steps of the onboarding wizard.
///
/// Progresses linearly: Background → Focus → Time → Plan → Complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    Background,
    Focus,
    Time,
    Plan,
    Complete,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Background, Focus) | (Focus, Time) | (Time, Plan) | (Plan, Complete)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether this step is answered by picking from a generated question.
    pub fn is_question(&self) -> bool {
        matches!(self, Self::Background | Self::Focus | Self::Time)
    }

    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Background => Some(Focus),
            Focus => Some(Time),
            Time => Some(Plan),
            Plan => Some(Complete),
            Complete => None,
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Background => "background",
            Self::Focus => "focus",
            Self::Time => "time",
            Self::Plan => "plan",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Answers collected so far in one flow. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAnswers {
    pub background: Option<String>,
    pub focus_goal: Option<String>,
    pub time: Option<String>,
}

impl SessionAnswers {
    /// All three answers, if every one has been given.
    pub fn complete(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.background.as_deref()?,
            self.focus_goal.as_deref()?,
            self.time.as_deref()?,
        ))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One user's pass through the wizard.
///
/// The flow is held by the caller, not the [`Planner`], so any number of
/// flows can share one planner. Dropping the flow abandons it.
#[derive(Debug, Clone, Default)]
pub struct OnboardingFlow {
    step: OnboardingStep,
    answers: SessionAnswers,
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.step
    }

    pub fn answers(&self) -> &SessionAnswers {
        &self.answers
    }

    /// Ask the planner for the current step's question.
    ///
    /// May be called repeatedly for the same step, e.g. after a failed
    /// generation.
    pub async fn next_question(
        &self,
        planner: &Planner,
    ) -> Result<OnboardingQuestion, PlannerError> {
        if !self.step.is_question() {
            return Err(PlannerError::invalid_input(
                "step",
                format!("no question is asked at the {} step", self.step),
            ));
        }
        match self.step {
            OnboardingStep::Background => planner.get_background_question().await,
            OnboardingStep::Focus => {
                let background = self.answers.background.as_deref().unwrap_or_default();
                planner.get_followup_question(background).await
            }
            _ => planner.get_time_question().await,
        }
    }

    /// Record the user's answer to the current question and advance.
    pub fn answer(
        &mut self,
        planner: &Planner,
        value: &str,
    ) -> Result<OnboardingStep, PlannerError> {
        if !self.step.is_question() {
            return Err(PlannerError::invalid_input(
                "step",
                format!("nothing to answer at the {} step", self.step),
            ));
        }
        match self.step {
            OnboardingStep::Background => {
                let category = resolve_background(planner.backgrounds(), value)?;
                self.answers.background = Some(category.name.clone());
            }
            OnboardingStep::Focus => {
                self.answers.focus_goal = Some(require_text("focus_goal", value)?.to_string());
            }
            _ => {
                self.answers.time = Some(require_text("time", value)?.to_string());
            }
        }
        self.advance()
    }

    /// Generate the plan from the recorded answers.
    ///
    /// On success the answers are discarded and the flow is complete. On
    /// failure the flow stays at the plan step so the caller may retry.
    pub async fn generate_plan(&mut self, planner: &Planner) -> Result<LearningPlan, PlannerError> {
        if self.step != OnboardingStep::Plan {
            return Err(PlannerError::invalid_input(
                "step",
                format!("plan generation needs all answers; flow is at the {} step", self.step),
            ));
        }
        let Some((background, focus_goal, time)) = self.answers.complete() else {
            return Err(PlannerError::invalid_input("answers", "incomplete answers"));
        };

        let plan = planner
            .generate_learning_plan(background, focus_goal, time)
            .await?;

        self.answers.clear();
        self.advance()?;
        info!("Onboarding flow complete");
        Ok(plan)
    }

    fn advance(&mut self) -> Result<OnboardingStep, PlannerError> {
        let next = self
            .step
            .next()
            .filter(|next| self.step.can_transition_to(*next))
            .ok_or_else(|| {
                PlannerError::invalid_input("step", format!("cannot advance past {}", self.step))
            })?;
        self.step = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use OnboardingStep::*;
        for (from, to) in [(Background, Focus), (Focus, Time), (Time, Plan), (Plan, Complete)] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use OnboardingStep::*;
        assert!(!Background.can_transition_to(Time));
        assert!(!Time.can_transition_to(Focus));
        assert!(!Complete.can_transition_to(Background));
        assert!(!Plan.can_transition_to(Plan));
    }

    #[test]
    fn next_walks_all_steps() {
        use OnboardingStep::*;
        let mut current = Background;
        for expected in [Focus, Time, Plan, Complete] {
            current = current.next().unwrap();
            assert_eq!(current, expected);
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn only_first_three_steps_ask_questions() {
        use OnboardingStep::*;
        assert!(Background.is_question());
        assert!(Focus.is_question());
        assert!(Time.is_question());
        assert!(!Plan.is_question());
        assert!(!Complete.is_question());
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [Background, Focus, Time, Plan, Complete] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json);
        }
    }

    #[test]
    fn answers_complete_only_when_all_set() {
        let mut answers = SessionAnswers {
            background: Some("Tech".into()),
            focus_goal: Some("Frontend".into()),
            time: None,
        };
        assert!(answers.complete().is_none());
        answers.time = Some("10 minutes".into());
        assert_eq!(answers.complete(), Some(("Tech", "Frontend", "10 minutes")));
        answers.clear();
        assert_eq!(answers, SessionAnswers::default());
    }
}
