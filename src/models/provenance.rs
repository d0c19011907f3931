//! Provenance of AI-generated workout plans.

use serde::{Deserialize, Serialize};

/// How much of a generated plan survived normalization untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanProvenance {
    /// Model output was already valid
    Generated,
    /// Some fields were defaulted or dropped
    #[default]
    Repaired,
    /// The whole plan is the built-in default
    Fallback,
}

impl PlanProvenance {
    /// Returns true if a coach should look at the plan before assigning it.
    pub fn needs_review(&self) -> bool {
        matches!(self, PlanProvenance::Repaired | PlanProvenance::Fallback)
    }
}

impl std::fmt::Display for PlanProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanProvenance::Generated => write!(f, "generated"),
            PlanProvenance::Repaired => write!(f, "repaired"),
            PlanProvenance::Fallback => write!(f, "fallback"),
        }
    }
}
