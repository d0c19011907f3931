//! Workout Generator Agent.
//!
//! Asks the backend for a plan and runs the reply through the normalizer.
//! A backend that stays down or keeps returning junk yields the built-in
//! plan for the player's level; generation itself never fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::backend::{AiBackend, PlanPrompt};
use super::{Agent, AgentError, AgentOutput, RetryPolicy};
use crate::models::PlanProvenance;
use crate::normalize::{self, NormalizationFallback, NormalizedPlan, PlanContext};

/// Input for the Workout Generator agent.
#[derive(Debug, Clone, Default)]
pub struct WorkoutGeneratorInput {
    pub context: PlanContext,

    /// Free-text notes about the player (injuries, goals)
    pub notes: Option<String>,
}

/// Workout Generator agent implementation.
pub struct WorkoutGeneratorAgent {
    backend: Arc<dyn AiBackend>,
    retry: RetryPolicy,
}

impl WorkoutGeneratorAgent {
    pub fn new(backend: Arc<dyn AiBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_prompt(&self, input: &WorkoutGeneratorInput) -> PlanPrompt {
        let ctx = &input.context;
        let mut prompt = format!(
            "Create a {}-day basketball training plan for a {} player.",
            ctx.plan_days(),
            ctx.skill_level
        );
        if let Some(focus) = &ctx.focus {
            prompt.push_str(&format!("\nFocus area: {}", focus));
        }
        if let Some(notes) = &input.notes {
            prompt.push_str(&format!("\nPlayer notes: {}", notes));
        }
        PlanPrompt::new(WORKOUT_GENERATOR_SYSTEM_PROMPT, prompt)
    }

    /// Generate a plan, retrying transient failures per the policy.
    pub async fn generate(&self, input: &WorkoutGeneratorInput) -> NormalizedPlan {
        let prompt = self.build_prompt(input);
        let ctx = &input.context;
        let attempts = self.retry.max_retries + 1;
        let mut last_failure = String::from("no attempt made");
        let mut waited = false;

        for attempt in 1..=attempts {
            if attempt > 1 && !waited {
                tokio::time::sleep(self.retry.delay_for(attempt - 1)).await;
            }
            waited = false;

            match self.backend.generate_plan(&prompt).await {
                Ok(text) => {
                    let normalized = normalize::normalize_text(&text, ctx);
                    if normalized.provenance != PlanProvenance::Fallback {
                        info!(
                            backend = self.backend.name(),
                            attempt,
                            provenance = %normalized.provenance,
                            "Generated workout plan"
                        );
                        return normalized;
                    }
                    last_failure = "response contained no usable plan".to_string();
                    warn!(attempt, attempts, "Backend reply had no usable plan");
                }
                Err(AgentError::RateLimited(secs)) => {
                    last_failure = format!("rate limited for {}s", secs);
                    warn!(attempt, attempts, secs, "Backend rate limited");
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.rate_limit_delay(secs)).await;
                        waited = true;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, attempts, "Plan generation failed: {}", e);
                    last_failure = e.to_string();
                }
                Err(e) => {
                    warn!("Plan generation failed permanently: {}", e);
                    last_failure = e.to_string();
                    break;
                }
            }
        }

        debug!(reason = %last_failure, "Falling back to default plan");
        normalize::fallback(ctx, &last_failure)
    }
}

#[async_trait]
impl Agent for WorkoutGeneratorAgent {
    type Input = WorkoutGeneratorInput;
    type Output = AgentOutput<NormalizedPlan>;

    fn name(&self) -> &'static str {
        "workout_generator"
    }

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, AgentError> {
        let normalized = self.generate(&input).await;
        let notes = normalized.fallbacks.iter().map(describe).collect();
        let provenance = normalized.provenance;
        Ok(AgentOutput::new(normalized, provenance).with_notes(notes))
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }
}

fn describe(fallback: &NormalizationFallback) -> String {
    match fallback {
        NormalizationFallback::Field { path, reason } => format!("{}: {}", path, reason),
        NormalizationFallback::DroppedExercise { index } => {
            format!("exercises[{}]: dropped, not an object", index)
        }
        NormalizationFallback::DefaultExercise => "no usable exercises, added default".to_string(),
        NormalizationFallback::DefaultPlan { reason } => format!("default plan used: {}", reason),
    }
}

const WORKOUT_GENERATOR_SYSTEM_PROMPT: &str = r#"You are a basketball skills coach writing individual training plans.

Respond with a single JSON object and nothing else:
{
  "title": string (max 100 chars),
  "description": string (max 500 chars),
  "difficulty": "easy" | "moderate" | "hard" | "very-hard",
  "duration_days": integer 1-30,
  "exercises": [
    {
      "name": string (max 100 chars),
      "description": string (max 500 chars),
      "category": "shooting" | "ball-handling" | "passing" | "defense" | "conditioning" | "footwork" | "general",
      "difficulty": "easy" | "moderate" | "hard" | "very-hard",
      "sets": integer 1-20,
      "reps": integer 1-100,
      "duration_minutes": integer 1-180,
      "day": integer 1-7
    }
  ]
}

Match volume and difficulty to the player's level. Spread exercises across the week."#;
