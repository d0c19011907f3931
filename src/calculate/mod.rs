//! Statistics calculation engine.
//!
//! Turns completed sessions into leaderboard aggregates:
//! - Incremental stat updates (accuracy, streaks, points, personal bests)
//! - Achievement unlocks
//! - Rank ordering and leaderboard windows

pub mod accumulator;
pub mod achievements;
pub mod ranking;

use chrono::NaiveDate;
use thiserror::Error;

pub use accumulator::{apply, Applied, PointsAward, PointsPolicy, StatsWarning};
pub use achievements::{award, evaluate, AchievementRule, Evaluation, ACHIEVEMENT_RULES};
pub use ranking::{
    compare, nearby, page, rank_of, recompute_ranks, LeaderboardEntry, Pagination, PaginationMeta,
};

/// Errors raised by the pure statistics functions.
///
/// Both are recoverable: the input aggregate is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Achievement already earned: {0}")]
    DuplicateAchievement(String),
}

/// Clamp a percentage into [0, 100]. NaN becomes 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// `part / whole * 100`, or None when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(clamp_percent(part as f64 / whole as f64 * 100.0))
    }
}

/// Signed calendar-day gap from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
