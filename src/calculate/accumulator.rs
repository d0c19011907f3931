//! Incremental aggregate updates from completed sessions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{clamp_percent, days_between, percentage, StatsError};
use crate::models::{PlayerAggregate, SessionRecord};

/// Points every completed session earns.
pub const BASE_SESSION_POINTS: u64 = 10;

/// Bonus for a perfect session; scaled linearly by accuracy.
pub const MAX_ACCURACY_BONUS: u64 = 10;

/// (streak length in days, bonus points) paid on the session that reaches it.
pub const STREAK_MILESTONE_BONUSES: [(u32, u64); 4] = [(3, 5), (7, 15), (14, 30), (30, 50)];

/// One streak milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakBonus {
    pub days: u32,
    pub points: u64,
}

/// Point award coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsPolicy {
    #[serde(default = "default_base_points")]
    pub base_points: u64,

    #[serde(default = "default_accuracy_bonus")]
    pub max_accuracy_bonus: u64,

    #[serde(default = "default_streak_bonuses")]
    pub streak_bonuses: Vec<StreakBonus>,
}

fn default_base_points() -> u64 {
    BASE_SESSION_POINTS
}

fn default_accuracy_bonus() -> u64 {
    MAX_ACCURACY_BONUS
}

fn default_streak_bonuses() -> Vec<StreakBonus> {
    STREAK_MILESTONE_BONUSES
        .iter()
        .map(|&(days, points)| StreakBonus { days, points })
        .collect()
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self {
            base_points: default_base_points(),
            max_accuracy_bonus: default_accuracy_bonus(),
            streak_bonuses: default_streak_bonuses(),
        }
    }
}

impl PointsPolicy {
    /// Accuracy bonus for a session accuracy in percent.
    pub fn accuracy_bonus(&self, accuracy: f64) -> u64 {
        (self.max_accuracy_bonus as f64 * clamp_percent(accuracy) / 100.0).round() as u64
    }

    /// Bonus for having just reached `streak` days.
    pub fn streak_bonus(&self, streak: u32) -> u64 {
        self.streak_bonuses
            .iter()
            .filter(|b| b.days == streak)
            .map(|b| b.points)
            .sum()
    }

    /// Full award for one session. `streak_reached` is the new streak length
    /// when this session advanced or restarted the streak.
    pub fn award(&self, accuracy: f64, streak_reached: Option<u32>) -> PointsAward {
        PointsAward {
            base: self.base_points,
            accuracy_bonus: self.accuracy_bonus(accuracy),
            streak_bonus: streak_reached.map_or(0, |s| self.streak_bonus(s)),
        }
    }
}

/// Breakdown of the points one session earned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAward {
    pub base: u64,
    pub accuracy_bonus: u64,
    pub streak_bonus: u64,
}

impl PointsAward {
    pub fn total(&self) -> u64 {
        self.base + self.accuracy_bonus + self.streak_bonus
    }
}

/// Non-fatal problems found while applying a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsWarning {
    #[error("Session dated {session_date} precedes last workout {last_workout_date}; streak left unchanged")]
    OutOfOrderSession {
        last_workout_date: NaiveDate,
        session_date: NaiveDate,
    },
}

/// Result of applying one session.
#[derive(Debug, Clone)]
pub struct Applied {
    pub aggregate: PlayerAggregate,
    pub award: PointsAward,
    pub warnings: Vec<StatsWarning>,
}

/// Apply a completed session to an aggregate, returning the updated copy.
///
/// The caller guarantees each session is applied at most once.
pub fn apply(
    aggregate: &PlayerAggregate,
    session: &SessionRecord,
    policy: &PointsPolicy,
) -> Result<Applied, StatsError> {
    validate(aggregate, session)?;

    let mut next = aggregate.clone();
    let mut warnings = Vec::new();
    let session_accuracy = clamp_percent(session.overall_accuracy);

    next.total_workouts_completed += 1;

    next.total_shots_made += session.shots_made as u64;
    next.total_shots_attempted += session.shots_attempted as u64;
    if let Some(accuracy) = percentage(next.total_shots_made, next.total_shots_attempted) {
        next.average_accuracy = accuracy;
    }
    next.average_accuracy = clamp_percent(next.average_accuracy);
    next.best_accuracy = clamp_percent(next.best_accuracy.max(session_accuracy));

    next.total_calories_burned += session.calories_burned as u64;
    next.total_training_hours += session.completion_time as f64 / 60.0;

    let bests = &mut next.personal_bests;
    bests.most_shots_in_session = bests.most_shots_in_session.max(session.shots_made);
    bests.highest_accuracy = clamp_percent(bests.highest_accuracy.max(session_accuracy));
    bests.longest_workout_minutes = bests.longest_workout_minutes.max(session.completion_time);
    bests.most_calories_in_session = bests.most_calories_in_session.max(session.calories_burned);

    let streak_reached = match update_streak(&mut next, session.date) {
        Ok(reached) => reached,
        Err(warning) => {
            warn!(player = %next.player_id, "{}", warning);
            warnings.push(warning);
            None
        }
    };
    next.longest_streak = next.longest_streak.max(next.current_streak);

    next.completion_rate =
        percentage(next.total_workouts_completed, next.total_workouts_assigned).unwrap_or(0.0);

    let award = policy.award(session_accuracy, streak_reached);
    next.add_points(award.total());

    debug!(
        player = %next.player_id,
        points = award.total(),
        streak = next.current_streak,
        "Applied session"
    );

    Ok(Applied {
        aggregate: next,
        award,
        warnings,
    })
}

fn validate(aggregate: &PlayerAggregate, session: &SessionRecord) -> Result<(), StatsError> {
    if !session.completed {
        return Err(StatsError::InvalidSession(
            "session is not completed".to_string(),
        ));
    }
    if !aggregate.is_active {
        return Err(StatsError::InvalidSession(format!(
            "player {} is inactive",
            aggregate.player_id
        )));
    }
    if session.shots_made > session.shots_attempted {
        return Err(StatsError::InvalidSession(format!(
            "{} shots made but only {} attempted",
            session.shots_made, session.shots_attempted
        )));
    }
    Ok(())
}

/// Advance, keep, or restart the streak for a session on `date`.
///
/// Returns the new streak length when it changed, `None` for a same-day
/// repeat, and a warning for sessions older than the last recorded one.
fn update_streak(agg: &mut PlayerAggregate, date: NaiveDate) -> Result<Option<u32>, StatsWarning> {
    let Some(last) = agg.last_workout_date else {
        agg.current_streak = 1;
        agg.last_workout_date = Some(date);
        return Ok(Some(1));
    };

    let gap = days_between(last, date);
    let reached = match gap {
        g if g < 0 => {
            return Err(StatsWarning::OutOfOrderSession {
                last_workout_date: last,
                session_date: date,
            })
        }
        0 => None,
        1 => {
            agg.current_streak += 1;
            Some(agg.current_streak)
        }
        _ => {
            agg.current_streak = 1;
            Some(1)
        }
    };
    agg.last_workout_date = Some(date);
    Ok(reached)
}
