//! Per-player leaderboard aggregate.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Achievement grouping shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Milestone,
    Streak,
    Accuracy,
    Volume,
    Fitness,
}

impl std::fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AchievementCategory::Milestone => write!(f, "milestone"),
            AchievementCategory::Streak => write!(f, "streak"),
            AchievementCategory::Accuracy => write!(f, "accuracy"),
            AchievementCategory::Volume => write!(f, "volume"),
            AchievementCategory::Fitness => write!(f, "fitness"),
        }
    }
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub achievement_id: String,
    pub title: String,
    pub category: AchievementCategory,
    pub points: u64,
    pub earned_at: DateTime<Utc>,
}

/// Achievements in the order they were earned, unique by id.
///
/// Serialized as a plain list; the id index is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Achievement>", into = "Vec<Achievement>")]
pub struct AchievementSet {
    items: Vec<Achievement>,
    #[serde(skip)]
    ids: HashSet<String>,
}

impl AchievementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, achievement_id: &str) -> bool {
        self.ids.contains(achievement_id)
    }

    /// Append an achievement. Returns false (and leaves the set untouched)
    /// when the id is already present.
    pub fn insert(&mut self, achievement: Achievement) -> bool {
        if !self.ids.insert(achievement.achievement_id.clone()) {
            return false;
        }
        self.items.push(achievement);
        true
    }

    pub fn get(&self, achievement_id: &str) -> Option<&Achievement> {
        if !self.contains(achievement_id) {
            return None;
        }
        self.items
            .iter()
            .find(|a| a.achievement_id == achievement_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<Achievement>> for AchievementSet {
    fn from(list: Vec<Achievement>) -> Self {
        // Stored files may predate the uniqueness check; first occurrence wins.
        let mut set = AchievementSet::new();
        for achievement in list {
            set.insert(achievement);
        }
        set
    }
}

impl From<AchievementSet> for Vec<Achievement> {
    fn from(set: AchievementSet) -> Self {
        set.items
    }
}

/// Single-session records. Each field only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub most_shots_in_session: u32,
    pub highest_accuracy: f64,
    pub longest_workout_minutes: u32,
    pub most_calories_in_session: u32,
}

/// Aggregate statistics for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAggregate {
    pub player_id: PlayerId,
    pub display_name: String,
    #[serde(default)]
    pub season: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,

    // Counters
    pub total_workouts_completed: u64,
    pub total_workouts_assigned: u64,
    pub total_shots_made: u64,
    pub total_shots_attempted: u64,
    pub total_calories_burned: u64,
    pub total_training_hours: f64,

    // Rates, 0-100
    pub completion_rate: f64,
    pub average_accuracy: f64,
    pub best_accuracy: f64,

    // Streak
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_workout_date: Option<NaiveDate>,

    // Points
    pub points: u64,
    pub weekly_points: u64,
    pub monthly_points: u64,

    /// Current position, 1 = best, 0 = not ranked yet.
    pub rank: u32,
    pub previous_rank: u32,

    #[serde(default)]
    pub achievements: AchievementSet,

    #[serde(default)]
    pub personal_bests: PersonalBests,

    pub is_active: bool,
}

impl PlayerAggregate {
    /// Empty aggregate for a newly registered player.
    pub fn new(player_id: PlayerId, display_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            season: None,
            created_at,
            version: 0,
            total_workouts_completed: 0,
            total_workouts_assigned: 0,
            total_shots_made: 0,
            total_shots_attempted: 0,
            total_calories_burned: 0,
            total_training_hours: 0.0,
            completion_rate: 0.0,
            average_accuracy: 0.0,
            best_accuracy: 0.0,
            current_streak: 0,
            longest_streak: 0,
            last_workout_date: None,
            points: 0,
            weekly_points: 0,
            monthly_points: 0,
            rank: 0,
            previous_rank: 0,
            achievements: AchievementSet::new(),
            personal_bests: PersonalBests::default(),
            is_active: true,
        }
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn total_achievements(&self) -> usize {
        self.achievements.len()
    }

    /// Positive when the player climbed since the previous recompute.
    pub fn rank_change(&self) -> i64 {
        if self.rank == 0 || self.previous_rank == 0 {
            return 0;
        }
        self.previous_rank as i64 - self.rank as i64
    }

    /// Add points to the lifetime, weekly and monthly totals.
    pub fn add_points(&mut self, amount: u64) {
        self.points = self.points.saturating_add(amount);
        self.weekly_points = self.weekly_points.saturating_add(amount);
        self.monthly_points = self.monthly_points.saturating_add(amount);
    }
}
