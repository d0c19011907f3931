//! Milestone achievements.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::StatsError;
use crate::models::{Achievement, AchievementCategory, PlayerAggregate};

/// Minimum lifetime attempts before accuracy achievements count.
pub const SHARPSHOOTER_MIN_ATTEMPTS: u64 = 100;

/// A milestone and the condition that unlocks it.
pub struct AchievementRule {
    pub id: &'static str,
    pub title: &'static str,
    pub category: AchievementCategory,
    pub points: u64,
    pub unlocked: fn(&PlayerAggregate) -> bool,
}

impl AchievementRule {
    fn to_achievement(&self, earned_at: DateTime<Utc>) -> Achievement {
        Achievement {
            achievement_id: self.id.to_string(),
            title: self.title.to_string(),
            category: self.category,
            points: self.points,
            earned_at,
        }
    }
}

impl std::fmt::Debug for AchievementRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AchievementRule")
            .field("id", &self.id)
            .field("points", &self.points)
            .finish()
    }
}

pub static ACHIEVEMENT_RULES: &[AchievementRule] = &[
    AchievementRule {
        id: "first_workout",
        title: "First Workout",
        category: AchievementCategory::Milestone,
        points: 10,
        unlocked: |a| a.total_workouts_completed >= 1,
    },
    AchievementRule {
        id: "workouts_10",
        title: "Gym Rat",
        category: AchievementCategory::Milestone,
        points: 25,
        unlocked: |a| a.total_workouts_completed >= 10,
    },
    AchievementRule {
        id: "workouts_50",
        title: "Grinder",
        category: AchievementCategory::Milestone,
        points: 100,
        unlocked: |a| a.total_workouts_completed >= 50,
    },
    AchievementRule {
        id: "workouts_100",
        title: "Century Club",
        category: AchievementCategory::Milestone,
        points: 200,
        unlocked: |a| a.total_workouts_completed >= 100,
    },
    AchievementRule {
        id: "streak_3",
        title: "Heating Up",
        category: AchievementCategory::Streak,
        points: 15,
        unlocked: |a| a.longest_streak >= 3,
    },
    AchievementRule {
        id: "streak_7",
        title: "Week Warrior",
        category: AchievementCategory::Streak,
        points: 50,
        unlocked: |a| a.longest_streak >= 7,
    },
    AchievementRule {
        id: "streak_30",
        title: "Unstoppable",
        category: AchievementCategory::Streak,
        points: 200,
        unlocked: |a| a.longest_streak >= 30,
    },
    AchievementRule {
        id: "sharpshooter",
        title: "Sharpshooter",
        category: AchievementCategory::Accuracy,
        points: 75,
        unlocked: |a| {
            a.total_shots_attempted >= SHARPSHOOTER_MIN_ATTEMPTS && a.average_accuracy >= 90.0
        },
    },
    AchievementRule {
        id: "makes_1000",
        title: "Thousand Makes",
        category: AchievementCategory::Volume,
        points: 100,
        unlocked: |a| a.total_shots_made >= 1000,
    },
    AchievementRule {
        id: "calories_10000",
        title: "Furnace",
        category: AchievementCategory::Fitness,
        points: 50,
        unlocked: |a| a.total_calories_burned >= 10_000,
    },
];

/// Result of evaluating the rule table.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub aggregate: PlayerAggregate,
    pub newly_earned: Vec<Achievement>,
}

/// Award every rule that holds and has not been earned yet.
///
/// Running it again on its own output earns nothing new.
pub fn evaluate(aggregate: &PlayerAggregate, now: DateTime<Utc>) -> Evaluation {
    let mut next = aggregate.clone();
    let mut newly_earned = Vec::new();

    for rule in ACHIEVEMENT_RULES {
        if next.achievements.contains(rule.id) || !(rule.unlocked)(&next) {
            continue;
        }
        let achievement = rule.to_achievement(now);
        match award(&mut next, achievement.clone()) {
            Ok(()) => {
                info!(player = %next.player_id, achievement = rule.id, "Achievement unlocked");
                newly_earned.push(achievement);
            }
            Err(e) => debug!("{}", e),
        }
    }

    Evaluation {
        aggregate: next,
        newly_earned,
    }
}

/// Append an achievement and credit its bonus points.
///
/// Duplicates are rejected and leave the aggregate unchanged.
pub fn award(aggregate: &mut PlayerAggregate, achievement: Achievement) -> Result<(), StatsError> {
    let id = achievement.achievement_id.clone();
    let points = achievement.points;
    if !aggregate.achievements.insert(achievement) {
        return Err(StatsError::DuplicateAchievement(id));
    }
    aggregate.add_points(points);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 18, 30, 0).unwrap()
    }

    fn player() -> PlayerAggregate {
        PlayerAggregate::new("p1".into(), "Jordan", now())
    }

    #[test]
    fn test_rule_ids_unique() {
        let ids: HashSet<_> = ACHIEVEMENT_RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENT_RULES.len());
    }

    #[test]
    fn test_nothing_earned_on_empty_aggregate() {
        let eval = evaluate(&player(), now());
        assert!(eval.newly_earned.is_empty());
        assert_eq!(eval.aggregate.points, 0);
    }

    #[test]
    fn test_first_workout_unlocks_with_bonus() {
        let mut agg = player();
        agg.total_workouts_completed = 1;
        agg.points = 20;

        let eval = evaluate(&agg, now());
        assert_eq!(eval.newly_earned.len(), 1);
        assert_eq!(eval.newly_earned[0].achievement_id, "first_workout");
        assert_eq!(eval.newly_earned[0].earned_at, now());
        assert_eq!(eval.aggregate.points, 30);
        assert_eq!(eval.aggregate.weekly_points, 10);
        assert_eq!(eval.aggregate.total_achievements(), 1);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut agg = player();
        agg.total_workouts_completed = 12;
        agg.longest_streak = 7;

        let first = evaluate(&agg, now());
        assert_eq!(first.newly_earned.len(), 4);

        let second = evaluate(&first.aggregate, now());
        assert!(second.newly_earned.is_empty());
        assert_eq!(second.aggregate.points, first.aggregate.points);
        assert_eq!(second.aggregate.total_achievements(), 4);
    }

    #[test]
    fn test_sharpshooter_needs_volume() {
        let mut agg = player();
        agg.average_accuracy = 95.0;
        agg.total_shots_attempted = 20;
        agg.total_shots_made = 19;
        assert!(evaluate(&agg, now()).newly_earned.is_empty());

        agg.total_shots_attempted = SHARPSHOOTER_MIN_ATTEMPTS;
        let earned = evaluate(&agg, now()).newly_earned;
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].category, AchievementCategory::Accuracy);
    }

    #[test]
    fn test_award_rejects_duplicate() {
        let mut agg = player();
        let rule = &ACHIEVEMENT_RULES[0];
        award(&mut agg, rule.to_achievement(now())).unwrap();
        let before = agg.clone();

        let err = award(&mut agg, rule.to_achievement(now())).unwrap_err();
        assert_eq!(err, StatsError::DuplicateAchievement("first_workout".to_string()));
        assert_eq!(agg, before);
    }
}
