//! Workout plan models.

use serde::{Deserialize, Serialize};

use super::WorkoutId;

/// Max length of titles and exercise names.
pub const MAX_NAME_LEN: usize = 100;
/// Max length of plan and exercise descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 500;

pub const SETS_RANGE: (u32, u32) = (1, 20);
pub const REPS_RANGE: (u32, u32) = (1, 100);
pub const EXERCISE_MINUTES_RANGE: (u32, u32) = (1, 180);
pub const PLAN_DAYS_RANGE: (u32, u32) = (1, 30);
pub const DAY_RANGE: (u32, u32) = (1, 7);

/// Difficulty tiers, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    #[default]
    Moderate,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Hard => "hard",
            Difficulty::VeryHard => "very-hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player skill level requested for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }

    /// Difficulty a plan should default to for this level.
    pub fn default_difficulty(&self) -> Difficulty {
        match self {
            SkillLevel::Beginner => Difficulty::Easy,
            SkillLevel::Intermediate => Difficulty::Moderate,
            SkillLevel::Advanced => Difficulty::Hard,
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "advanced" => Ok(SkillLevel::Advanced),
            other => Err(format!("unknown skill level: {}", other)),
        }
    }
}

/// What an exercise trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseCategory {
    Shooting,
    BallHandling,
    Passing,
    Defense,
    Conditioning,
    Footwork,
    #[default]
    General,
}

impl ExerciseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCategory::Shooting => "shooting",
            ExerciseCategory::BallHandling => "ball-handling",
            ExerciseCategory::Passing => "passing",
            ExerciseCategory::Defense => "defense",
            ExerciseCategory::Conditioning => "conditioning",
            ExerciseCategory::Footwork => "footwork",
            ExerciseCategory::General => "general",
        }
    }
}

impl std::fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single drill within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub description: String,
    pub category: ExerciseCategory,
    pub difficulty: Difficulty,
    pub sets: u32,
    pub reps: u32,
    pub duration_minutes: u32,
    /// Day of the week, 1-7
    pub day: u32,
}

/// A multi-day workout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: WorkoutId,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub skill_level: SkillLevel,
    pub duration_days: u32,
    pub exercises: Vec<Exercise>,
}
