//! AI-backed agents.
//!
//! Agents turn a request into structured data by asking a generative backend
//! and repairing what comes back. All agents implement the `Agent` trait.

pub mod backend;
pub mod workout_generator;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PlanProvenance;

pub use crate::normalize::extract_json;

/// Errors that can occur during agent execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("AI backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("AI response unparseable: {0}")]
    ResponseParseError(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AgentError::Io(_))
    }
}

/// Retry policy for agents.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound on any single wait, backoff or server-requested.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// No retries, no delay.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 0,
            backoff_multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let ms = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(ms.min(self.max_delay_ms))
    }

    /// Wait for a rate-limited backend, capped like any other delay.
    pub fn rate_limit_delay(&self, retry_after_secs: u64) -> Duration {
        Duration::from_millis(retry_after_secs.saturating_mul(1000).min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

/// Output wrapper with provenance and notes.
#[derive(Debug, Clone)]
pub struct AgentOutput<T> {
    pub data: T,
    pub provenance: PlanProvenance,
    pub notes: Vec<String>,
}

impl<T> AgentOutput<T> {
    pub fn new(data: T, provenance: PlanProvenance) -> Self {
        Self {
            data,
            provenance,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Core trait for all AI agents.
#[async_trait]
pub trait Agent {
    type Input;
    type Output;

    /// Agent identifier for logging.
    fn name(&self) -> &'static str;

    /// Execute the agent's task.
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, AgentError>;

    /// Retry policy for this agent.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay_ms, 1000);
    }

    #[test]
    fn test_backoff_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(RetryPolicy::none().delay_for(5), Duration::ZERO);
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limit_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(5), Duration::from_secs(5));
        assert_eq!(policy.rate_limit_delay(86_400), Duration::from_secs(30));
        assert_eq!(policy.rate_limit_delay(u64::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_agent_output() {
        let output = AgentOutput::new("plan", PlanProvenance::Repaired)
            .with_notes(vec!["exercises[0].sets defaulted".to_string()]);

        assert_eq!(output.data, "plan");
        assert_eq!(output.provenance, PlanProvenance::Repaired);
        assert_eq!(output.notes.len(), 1);
    }

    #[test]
    fn test_transient_errors() {
        assert!(AgentError::Timeout(30).is_transient());
        assert!(AgentError::BackendUnavailable("down".into()).is_transient());
        assert!(!AgentError::Io(std::io::Error::other("disk")).is_transient());
    }
}
