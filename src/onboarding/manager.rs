//! Planner: runs each onboarding step through prompt building, inference,
//! and response validation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::llm::{GenerateRequest, LlmProvider, ProviderHealth};

use super::model::{BackgroundCatalog, LearningPlan, OnboardingQuestion};
use super::prompts::{
    StepPrompt, build_step1_prompt, build_step2_prompt, build_step3_prompt,
    build_step4_prompt, system_prompt,
};
use super::validate::{StepSchema, accept};

/// Temperature used for every step.
const TEMPERATURE: f32 = 0.0;

/// Settings for the planner.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    /// Token budget per generation.
    pub num_predict: u32,
    /// Recognized backgrounds for step 2.
    pub backgrounds: BackgroundCatalog,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            num_predict: 4096,
            backgrounds: BackgroundCatalog::default(),
        }
    }
}

impl From<&PlannerConfig> for PlannerSettings {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            num_predict: config.num_predict,
            backgrounds: config.backgrounds.clone(),
        }
    }
}

/// Runs the four onboarding steps against an LLM provider.
///
/// Holds no per-user state, so one planner can serve any number of
/// concurrent flows. Failures are returned classified and never retried
/// here; retry policy belongs to the caller.
pub struct Planner {
    llm: Arc<dyn LlmProvider>,
    settings: PlannerSettings,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: PlannerSettings) -> Self {
        Self { llm, settings }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn backgrounds(&self) -> &BackgroundCatalog {
        &self.settings.backgrounds
    }

    /// Step 1: what is the user's background?
    pub async fn get_background_question(&self) -> Result<OnboardingQuestion, PlannerError> {
        let prompt = build_step1_prompt(&self.settings.backgrounds);
        self.run(prompt).await
    }

    /// Step 2: a follow-up tailored to `background`.
    ///
    /// Unknown backgrounds are rejected before the model is called.
    pub async fn get_followup_question(
        &self,
        background: &str,
    ) -> Result<OnboardingQuestion, PlannerError> {
        let prompt = build_step2_prompt(&self.settings.backgrounds, background)?;
        self.run(prompt).await
    }

    /// Step 3: how much time per day?
    pub async fn get_time_question(&self) -> Result<OnboardingQuestion, PlannerError> {
        self.run(build_step3_prompt()).await
    }

    /// Step 4: the seven-day plan.
    ///
    /// Takes every answer explicitly and does not depend on the earlier
    /// steps having run. Expect this to take tens of seconds.
    pub async fn generate_learning_plan(
        &self,
        background: &str,
        focus_goal: &str,
        time: &str,
    ) -> Result<LearningPlan, PlannerError> {
        let prompt = build_step4_prompt(background, focus_goal, time)?;
        self.run(prompt).await
    }

    /// Probe the provider.
    pub async fn health(&self) -> Result<ProviderHealth, PlannerError> {
        Ok(self.llm.health_check().await?)
    }

    async fn run<T: StepSchema>(&self, prompt: StepPrompt) -> Result<T, PlannerError> {
        debug_assert_eq!(
            prompt.schema,
            T::KIND,
            "{} prompt validated as {}",
            prompt.step,
            T::NAME
        );
        let step = prompt.step;
        let request = GenerateRequest::new(prompt.text)
            .with_system(system_prompt())
            .with_temperature(TEMPERATURE)
            .with_num_predict(self.settings.num_predict);

        let started = Instant::now();
        let response = self.llm.generate(request).await.map_err(|e| {
            warn!(%step, error = %e, "Inference call failed");
            PlannerError::from(e)
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match accept::<T>(&response.content) {
            Ok(value) => {
                info!(
                    %step,
                    schema = T::NAME,
                    elapsed_ms,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Onboarding step accepted"
                );
                Ok(value)
            }
            Err(e) => {
                let err = PlannerError::from(e);
                warn!(
                    %step,
                    schema = T::NAME,
                    elapsed_ms,
                    done_reason = response.done_reason.as_deref().unwrap_or("unknown"),
                    error = %err,
                    raw = %response.content,
                    "Model response rejected"
                );
                Err(err)
            }
        }
    }
}
