//! Workout plan normalizer.
//!
//! Model output is only loosely shaped by the prompt: fields go missing,
//! numbers arrive as strings, enums drift ("expert", "Medium"), and text runs
//! long. [`normalize`] coerces whatever came back into a valid
//! [`WorkoutPlan`]. It never fails; every substitution is recorded on the
//! returned [`NormalizedPlan`] instead.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{
    Difficulty, EntityId, Exercise, ExerciseCategory, PlanProvenance, SkillLevel, WorkoutPlan,
    DAY_RANGE, EXERCISE_MINUTES_RANGE, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, PLAN_DAYS_RANGE,
    REPS_RANGE, SETS_RANGE,
};

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: u32 = 10;
pub const DEFAULT_EXERCISE_MINUTES: u32 = 15;
pub const DEFAULT_PLAN_DAYS: u32 = 7;

/// Exercises kept per plan; the rest are dropped.
pub const MAX_EXERCISES: usize = 50;

/// Appended to text cut at its length limit.
pub const TRUNCATION_MARKER: &str = "...";

/// What the caller asked the model for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanContext {
    pub skill_level: SkillLevel,
    pub duration_days: Option<u32>,
    pub focus: Option<String>,
}

impl PlanContext {
    pub fn new(skill_level: SkillLevel) -> Self {
        Self {
            skill_level,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, days: u32) -> Self {
        self.duration_days = Some(days);
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    /// Requested plan length, clamped to the allowed range.
    pub(crate) fn plan_days(&self) -> u32 {
        self.duration_days
            .unwrap_or(DEFAULT_PLAN_DAYS)
            .clamp(PLAN_DAYS_RANGE.0, PLAN_DAYS_RANGE.1)
    }
}

/// A value the normalizer had to invent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationFallback {
    /// A field was missing or unusable and got its default.
    Field { path: String, reason: String },
    /// An exercise entry was not an object and was dropped.
    DroppedExercise { index: usize },
    /// No exercise survived; the fixed default exercise was added.
    DefaultExercise,
    /// Nothing usable at all; the whole plan is the built-in default.
    DefaultPlan { reason: String },
}

/// Normalizer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPlan {
    pub plan: WorkoutPlan,
    pub fallbacks: Vec<NormalizationFallback>,
    pub provenance: PlanProvenance,
}

impl NormalizedPlan {
    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Coerce an untyped plan document into a valid plan.
pub fn normalize(raw: &Value, ctx: &PlanContext) -> NormalizedPlan {
    let doc = unwrap_plan(raw);

    let exercises = match doc {
        Value::Object(obj) => field(obj, &["exercises", "drills", "workouts", "activities"])
            .and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    };
    let Some(exercises) = exercises else {
        return fallback(ctx, "no exercise list in response");
    };

    let empty = Map::new();
    let obj = doc.as_object().unwrap_or(&empty);
    let mut repair = Repair::default();

    let skill_level = ctx.skill_level;
    let difficulty = match field(obj, &["difficulty", "intensity", "level"]) {
        Some(v) => repair.difficulty("difficulty", v),
        None => skill_level.default_difficulty(),
    };

    let title = repair.text(
        "title",
        field(obj, &["title", "name"]),
        MAX_NAME_LEN,
        || format!("{} Basketball Workout", capitalize(skill_level.as_str())),
    );
    let description = repair.text(
        "description",
        field(obj, &["description", "summary", "overview"]),
        MAX_DESCRIPTION_LEN,
        || format!("{}-day {} training plan", ctx.plan_days(), skill_level),
    );
    let duration_days = repair.bounded(
        "duration_days",
        field(obj, &["duration_days", "durationDays", "days", "duration"]),
        PLAN_DAYS_RANGE,
        ctx.plan_days(),
    );

    let mut repaired: Vec<Exercise> = Vec::new();
    for (index, entry) in exercises.iter().enumerate() {
        if repaired.len() == MAX_EXERCISES {
            repair.adjusted += 1;
            break;
        }
        match entry.as_object() {
            Some(ex) => repaired.push(repair.exercise(index, ex, difficulty)),
            None => repair
                .fallbacks
                .push(NormalizationFallback::DroppedExercise { index }),
        }
    }
    if repaired.is_empty() {
        repair.fallbacks.push(NormalizationFallback::DefaultExercise);
        repaired.push(default_exercise(difficulty));
    }

    let plan = build_plan(title, description, difficulty, skill_level, duration_days, repaired);
    let provenance = if repair.fallbacks.is_empty() && repair.adjusted == 0 {
        PlanProvenance::Generated
    } else {
        PlanProvenance::Repaired
    };

    debug!(
        plan = %plan.id,
        exercises = plan.exercises.len(),
        fallbacks = repair.fallbacks.len(),
        adjusted = repair.adjusted,
        "Normalized workout plan"
    );

    NormalizedPlan {
        plan,
        fallbacks: repair.fallbacks,
        provenance,
    }
}

/// Like [`normalize`], but starting from raw model text.
pub fn normalize_text(raw: &str, ctx: &PlanContext) -> NormalizedPlan {
    let Some(json) = extract_json(raw) else {
        return fallback(ctx, "no JSON found in response");
    };
    match serde_json::from_str::<Value>(json) {
        Ok(value) => normalize(&value, ctx),
        Err(e) => fallback(ctx, &format!("invalid JSON: {}", e)),
    }
}

/// The built-in plan for a context, used when generation fails outright.
pub fn fallback(ctx: &PlanContext, reason: &str) -> NormalizedPlan {
    debug!(reason, skill = %ctx.skill_level, "Using fallback workout plan");
    NormalizedPlan {
        plan: fallback_plan(ctx),
        fallbacks: vec![NormalizationFallback::DefaultPlan {
            reason: reason.to_string(),
        }],
        provenance: PlanProvenance::Fallback,
    }
}

/// Pull the JSON document out of model text that may wrap it in prose or a
/// markdown fence.
pub fn extract_json(text: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence pattern is valid")
    });

    let text = fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str())
        .trim();

    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Fold any integer day into 1-7, keeping the weekly cycle.
pub fn wrap_day(day: i64) -> u32 {
    ((day.rem_euclid(7) + 6) % 7 + 1) as u32
}

/// Map a free-form difficulty token onto a tier.
pub fn parse_difficulty(token: &str) -> Option<Difficulty> {
    let token = token_key(token);
    let tier = match token.as_str() {
        "easy" | "beginner" | "light" | "simple" | "low" | "basic" | "novice" => Difficulty::Easy,
        "moderate" | "medium" | "intermediate" | "normal" | "average" | "regular" => {
            Difficulty::Moderate
        }
        "hard" | "difficult" | "challenging" | "advanced" | "high" | "tough" => Difficulty::Hard,
        "very-hard" | "veryhard" | "expert" | "extreme" | "elite" | "intense" | "insane"
        | "max" | "maximum" | "pro" => Difficulty::VeryHard,
        _ => return None,
    };
    Some(tier)
}

/// Map a free-form category token onto an exercise category.
pub fn parse_category(token: &str) -> Option<ExerciseCategory> {
    const KEYWORDS: &[(&str, ExerciseCategory)] = &[
        ("shoot", ExerciseCategory::Shooting),
        ("shot", ExerciseCategory::Shooting),
        ("free-throw", ExerciseCategory::Shooting),
        ("layup", ExerciseCategory::Shooting),
        ("dribbl", ExerciseCategory::BallHandling),
        ("handl", ExerciseCategory::BallHandling),
        ("pass", ExerciseCategory::Passing),
        ("defen", ExerciseCategory::Defense),
        ("rebound", ExerciseCategory::Defense),
        ("condition", ExerciseCategory::Conditioning),
        ("cardio", ExerciseCategory::Conditioning),
        ("endurance", ExerciseCategory::Conditioning),
        ("strength", ExerciseCategory::Conditioning),
        ("fitness", ExerciseCategory::Conditioning),
        ("footwork", ExerciseCategory::Footwork),
        ("agility", ExerciseCategory::Footwork),
        ("general", ExerciseCategory::General),
        ("skill", ExerciseCategory::General),
    ];
    let token = token_key(token);
    KEYWORDS
        .iter()
        .find(|(kw, _)| token.contains(kw))
        .map(|(_, category)| *category)
}

/// Cut `text` to at most `max` chars, ending with the marker when cut.
pub fn truncate(text: &str, max: usize) -> (String, bool) {
    if text.chars().count() <= max {
        return (text.to_string(), false);
    }
    let keep = max.saturating_sub(TRUNCATION_MARKER.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(TRUNCATION_MARKER);
    (cut, true)
}

#[derive(Default)]
struct Repair {
    fallbacks: Vec<NormalizationFallback>,
    adjusted: usize,
}

impl Repair {
    fn defaulted(&mut self, path: &str, reason: &str) {
        self.fallbacks.push(NormalizationFallback::Field {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    fn text(
        &mut self,
        path: &str,
        value: Option<&Value>,
        max: usize,
        default: impl FnOnce() -> String,
    ) -> String {
        let text = value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let Some(text) = text else {
            self.defaulted(path, "missing or not text");
            return truncate(&default(), max).0;
        };
        let (out, cut) = truncate(text, max);
        if cut {
            self.adjusted += 1;
        }
        out
    }

    fn bounded(&mut self, path: &str, value: Option<&Value>, range: (u32, u32), default: u32) -> u32 {
        let Some(n) = value.and_then(read_number) else {
            self.defaulted(path, "missing or not a number");
            return default;
        };
        let clamped = n.round().clamp(range.0 as f64, range.1 as f64);
        if clamped != n {
            self.adjusted += 1;
        }
        clamped as u32
    }

    fn difficulty(&mut self, path: &str, value: &Value) -> Difficulty {
        match value.as_str().and_then(parse_difficulty) {
            Some(tier) => {
                if value.as_str() != Some(tier.as_str()) {
                    self.adjusted += 1;
                }
                tier
            }
            None => {
                self.defaulted(path, "unrecognized difficulty");
                Difficulty::Moderate
            }
        }
    }

    fn day(&mut self, path: &str, value: Option<&Value>, index: usize) -> u32 {
        let position_day = (index % 7) as u32 + 1;
        let Some(value) = value else {
            return position_day;
        };
        if let Some(n) = read_number(value) {
            let day = n.round() as i64;
            let wrapped = wrap_day(day);
            if wrapped as i64 != day {
                self.adjusted += 1;
            }
            return wrapped;
        }
        if let Some(day) = value.as_str().and_then(weekday) {
            self.adjusted += 1;
            return day;
        }
        self.defaulted(path, "unreadable day");
        position_day
    }

    fn exercise(&mut self, index: usize, ex: &Map<String, Value>, plan_difficulty: Difficulty) -> Exercise {
        let path = |f: &str| format!("exercises[{}].{}", index, f);

        let name = self.text(
            &path("name"),
            field(ex, &["name", "title", "exercise", "drill"]),
            MAX_NAME_LEN,
            || format!("Drill {}", index + 1),
        );
        let description = match field(ex, &["description", "instructions", "notes"]) {
            Some(v) => self.text(&path("description"), Some(v), MAX_DESCRIPTION_LEN, String::new),
            None => String::new(),
        };
        let category = match field(ex, &["category", "type", "focus", "skill"]).and_then(Value::as_str) {
            Some(token) => parse_category(token).unwrap_or_else(|| {
                self.adjusted += 1;
                ExerciseCategory::General
            }),
            None => parse_category(&name).unwrap_or_default(),
        };
        let difficulty = match field(ex, &["difficulty", "intensity"]) {
            Some(v) => self.difficulty(&path("difficulty"), v),
            None => plan_difficulty,
        };
        let sets = self.bounded(&path("sets"), field(ex, &["sets"]), SETS_RANGE, DEFAULT_SETS);
        let reps = self.bounded(
            &path("reps"),
            field(ex, &["reps", "repetitions"]),
            REPS_RANGE,
            DEFAULT_REPS,
        );
        let duration_minutes = self.bounded(
            &path("duration_minutes"),
            field(ex, &["duration_minutes", "durationMinutes", "duration", "minutes", "time"]),
            EXERCISE_MINUTES_RANGE,
            DEFAULT_EXERCISE_MINUTES,
        );
        let day = self.day(&path("day"), field(ex, &["day", "dayOfWeek", "day_of_week"]), index);

        Exercise {
            name,
            description,
            category,
            difficulty,
            sets,
            reps,
            duration_minutes,
            day,
        }
    }
}

/// Accept `{"workout": {...}}` / `{"plan": {...}}` wrappers around the plan.
fn unwrap_plan(raw: &Value) -> &Value {
    if let Value::Object(obj) = raw {
        for key in ["workout", "plan", "workoutPlan", "workout_plan"] {
            if let Some(inner @ Value::Object(_)) = obj.get(key) {
                return inner;
            }
        }
    }
    raw
}

/// First non-null value among `keys`.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Numbers, or strings that start with one ("12", "12 reps", "4.5").
fn read_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            static LEADING: OnceLock<Regex> = OnceLock::new();
            let leading = LEADING
                .get_or_init(|| Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").expect("number pattern is valid"));
            leading.captures(s)?.get(1)?.as_str().parse().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn weekday(name: &str) -> Option<u32> {
    let name = token_key(name);
    let days = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
    days.iter()
        .position(|d| name.starts_with(d))
        .map(|i| i as u32 + 1)
}

fn token_key(token: &str) -> String {
    token
        .trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn build_plan(
    title: String,
    description: String,
    difficulty: Difficulty,
    skill_level: SkillLevel,
    duration_days: u32,
    exercises: Vec<Exercise>,
) -> WorkoutPlan {
    let names: Vec<&str> = exercises.iter().map(|e| e.name.as_str()).collect();
    let days = duration_days.to_string();
    let joined = names.join(",");
    let id = EntityId::from_content(&[&title, skill_level.as_str(), &days, &joined]);
    WorkoutPlan {
        id,
        title,
        description,
        difficulty,
        skill_level,
        duration_days,
        exercises,
    }
}

fn default_exercise(difficulty: Difficulty) -> Exercise {
    Exercise {
        name: "Form Shooting".to_string(),
        description: "One-hand form shots close to the rim, holding the follow-through on every make."
            .to_string(),
        category: ExerciseCategory::Shooting,
        difficulty,
        sets: DEFAULT_SETS,
        reps: DEFAULT_REPS,
        duration_minutes: DEFAULT_EXERCISE_MINUTES,
        day: DAY_RANGE.0,
    }
}

fn fallback_plan(ctx: &PlanContext) -> WorkoutPlan {
    let level = ctx.skill_level;
    let difficulty = level.default_difficulty();
    let (sets, reps, minutes) = match level {
        SkillLevel::Beginner => (2, 10, 10),
        SkillLevel::Intermediate => (3, 15, 15),
        SkillLevel::Advanced => (4, 20, 20),
    };
    let drill = |name: &str, description: &str, category, day| Exercise {
        name: name.to_string(),
        description: description.to_string(),
        category,
        difficulty,
        sets,
        reps,
        duration_minutes: minutes,
        day,
    };

    let exercises = vec![
        drill(
            "Form Shooting",
            "One-hand form shots close to the rim, holding the follow-through on every make.",
            ExerciseCategory::Shooting,
            1,
        ),
        drill(
            "Stationary Dribbling",
            "Pound dribbles, crossovers and between-the-legs with each hand, eyes up.",
            ExerciseCategory::BallHandling,
            2,
        ),
        drill(
            "Defensive Slides",
            "Lane-width slides in a low stance without crossing the feet.",
            ExerciseCategory::Defense,
            3,
        ),
        drill(
            "Wall Passing",
            "Chest and bounce passes against a wall, stepping into each pass.",
            ExerciseCategory::Passing,
            4,
        ),
        drill(
            "Line Sprints",
            "Baseline to free-throw line, half court, far free-throw line and full court.",
            ExerciseCategory::Conditioning,
            5,
        ),
    ];

    let days = ctx.plan_days();
    build_plan(
        format!("{} Basketball Fundamentals", capitalize(level.as_str())),
        format!("{}-day {} fundamentals plan covering shooting, handling, defense and conditioning", days, level),
        difficulty,
        level,
        days,
        exercises,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> PlanContext {
        PlanContext::new(SkillLevel::Intermediate).with_duration(14)
    }

    fn one_exercise(extra: Value) -> Value {
        let mut ex = json!({"name": "Spot Shooting", "sets": 3, "reps": 10, "duration_minutes": 20, "day": 1});
        if let (Some(base), Value::Object(extra)) = (ex.as_object_mut(), extra) {
            base.extend(extra);
        }
        json!({"title": "Shooter", "description": "Shots", "difficulty": "hard", "duration_days": 7, "exercises": [ex]})
    }

    #[test]
    fn test_clean_plan_passes_through() {
        let out = normalize(&one_exercise(json!({})), &ctx());
        assert_eq!(out.provenance, PlanProvenance::Generated);
        assert!(!out.used_fallback());
        assert_eq!(out.plan.title, "Shooter");
        assert_eq!(out.plan.difficulty, Difficulty::Hard);
        assert_eq!(out.plan.duration_days, 7);
        let ex = &out.plan.exercises[0];
        assert_eq!((ex.sets, ex.reps, ex.duration_minutes, ex.day), (3, 10, 20, 1));
        assert_eq!(ex.category, ExerciseCategory::Shooting);
        assert_eq!(ex.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_day_wraparound() {
        let day = |d: Value| normalize(&one_exercise(json!({"day": d})), &ctx()).plan.exercises[0].day;
        assert_eq!(day(json!(10)), 3);
        assert_eq!(day(json!(0)), 7);
        assert_eq!(day(json!(7)), 7);
        assert_eq!(day(json!(-1)), 6);
        assert_eq!(day(json!("Wednesday")), 3);
    }

    #[test]
    fn test_extreme_days_stay_in_week() {
        let day = |d: Value| normalize(&one_exercise(json!({"day": d})), &ctx()).plan.exercises[0].day;
        assert!((1..=7).contains(&day(json!(-1e30))));
        assert!((1..=7).contains(&day(json!(1e30))));
        assert!((1..=7).contains(&day(json!("-99999999999999999999"))));
        assert_eq!(wrap_day(i64::MIN), wrap_day(i64::MIN % 7));
        assert!((1..=7).contains(&wrap_day(i64::MAX)));
    }

    #[test]
    fn test_missing_day_uses_position() {
        let exercises: Vec<Value> = (0..9).map(|i| json!({"name": format!("Drill {}", i)})).collect();
        let out = normalize(&json!({"exercises": exercises}), &ctx());
        let days: Vec<u32> = out.plan.exercises.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![1, 2, 3, 4, 5, 6, 7, 1, 2]);
    }

    #[test]
    fn test_enum_repair() {
        let out = normalize(&one_exercise(json!({"difficulty": "expert"})), &ctx());
        assert_eq!(out.plan.exercises[0].difficulty, Difficulty::VeryHard);

        assert_eq!(parse_difficulty("Medium"), Some(Difficulty::Moderate));
        assert_eq!(parse_difficulty("advanced"), Some(Difficulty::Hard));
        assert_eq!(parse_difficulty("EXTREME"), Some(Difficulty::VeryHard));
        assert_eq!(parse_difficulty("very hard"), Some(Difficulty::VeryHard));
        assert_eq!(parse_difficulty("spicy"), None);
    }

    #[test]
    fn test_unknown_difficulty_defaults_to_moderate() {
        let mut doc = one_exercise(json!({"difficulty": "spicy"}));
        doc["difficulty"] = json!("ludicrous");
        let out = normalize(&doc, &ctx());
        assert_eq!(out.plan.difficulty, Difficulty::Moderate);
        assert_eq!(out.plan.exercises[0].difficulty, Difficulty::Moderate);
        assert_eq!(out.provenance, PlanProvenance::Repaired);
    }

    #[test]
    fn test_missing_plan_difficulty_follows_skill_level() {
        let out = normalize(&json!({"exercises": [{"name": "Layups"}]}), &PlanContext::new(SkillLevel::Beginner));
        assert_eq!(out.plan.difficulty, Difficulty::Easy);
        assert_eq!(out.plan.exercises[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_numeric_clamping() {
        let out = normalize(
            &one_exercise(json!({"sets": 99, "reps": 0, "duration_minutes": 600})),
            &ctx(),
        );
        let ex = &out.plan.exercises[0];
        assert_eq!((ex.sets, ex.reps, ex.duration_minutes), (20, 1, 180));
        assert_eq!(out.provenance, PlanProvenance::Repaired);
        assert!(out.fallbacks.is_empty());

        let mut doc = one_exercise(json!({}));
        doc["duration_days"] = json!(365);
        assert_eq!(normalize(&doc, &ctx()).plan.duration_days, 30);
    }

    #[test]
    fn test_numbers_in_strings_and_defaults() {
        let out = normalize(
            &one_exercise(json!({"sets": "4 sets", "reps": "lots", "duration_minutes": 12.6})),
            &ctx(),
        );
        let ex = &out.plan.exercises[0];
        assert_eq!(ex.sets, 4);
        assert_eq!(ex.reps, DEFAULT_REPS);
        assert_eq!(ex.duration_minutes, 13);
        assert!(out.fallbacks.contains(&NormalizationFallback::Field {
            path: "exercises[0].reps".to_string(),
            reason: "missing or not a number".to_string(),
        }));
    }

    #[test]
    fn test_string_truncation() {
        let long_name = "x".repeat(250);
        let out = normalize(&one_exercise(json!({"name": long_name, "description": "é".repeat(900)})), &ctx());
        let ex = &out.plan.exercises[0];
        assert_eq!(ex.name.chars().count(), MAX_NAME_LEN);
        assert!(ex.name.ends_with(TRUNCATION_MARKER));
        assert_eq!(ex.description.chars().count(), MAX_DESCRIPTION_LEN);

        assert_eq!(truncate("short", 10), ("short".to_string(), false));
    }

    #[test]
    fn test_empty_exercise_list_gets_default_exercise() {
        let out = normalize(&json!({"exercises": []}), &ctx());
        assert_eq!(out.plan.exercises.len(), 1);
        assert_eq!(out.plan.exercises[0].name, "Form Shooting");
        assert!(out.fallbacks.contains(&NormalizationFallback::DefaultExercise));
        assert_eq!(out.provenance, PlanProvenance::Repaired);
    }

    #[test]
    fn test_non_object_entries_dropped() {
        let out = normalize(&json!({"exercises": ["jump", 4, {"name": "Free Throws"}]}), &ctx());
        assert_eq!(out.plan.exercises.len(), 1);
        assert_eq!(out.plan.exercises[0].name, "Free Throws");
        assert_eq!(out.plan.exercises[0].day, 3);
        assert!(out.fallbacks.contains(&NormalizationFallback::DroppedExercise { index: 0 }));
    }

    #[test]
    fn test_garbage_document_gets_fallback_plan() {
        for raw in [json!(null), json!("nope"), json!({"title": "No drills"}), json!({"exercises": "many"})] {
            let out = normalize(&raw, &ctx());
            assert_eq!(out.provenance, PlanProvenance::Fallback);
            assert!(!out.plan.exercises.is_empty());
            assert_eq!(out.plan.duration_days, 14);
            assert!(matches!(out.fallbacks[0], NormalizationFallback::DefaultPlan { .. }));
        }
    }

    #[test]
    fn test_fallback_plan_scales_with_level() {
        let beginner = fallback(&PlanContext::new(SkillLevel::Beginner), "test").plan;
        let advanced = fallback(&PlanContext::new(SkillLevel::Advanced), "test").plan;
        assert_eq!(beginner.difficulty, Difficulty::Easy);
        assert_eq!(advanced.difficulty, Difficulty::Hard);
        assert!(advanced.exercises[0].sets > beginner.exercises[0].sets);
        assert_eq!(beginner.duration_days, DEFAULT_PLAN_DAYS);
    }

    #[test]
    fn test_wrapped_and_bare_array_documents() {
        let wrapped = normalize(&json!({"workout": {"title": "Wrapped", "exercises": [{"name": "Dribble Series"}]}}), &ctx());
        assert_eq!(wrapped.plan.title, "Wrapped");
        assert_eq!(wrapped.plan.exercises[0].category, ExerciseCategory::BallHandling);

        let bare = normalize(&json!([{"name": "Chest Passes"}]), &ctx());
        assert_eq!(bare.plan.exercises[0].category, ExerciseCategory::Passing);
        assert_eq!(bare.plan.title, "Intermediate Basketball Workout");
    }

    #[test]
    fn test_output_always_within_bounds() {
        let docs = [
            json!({"exercises": [{"sets": -5, "reps": 1e9, "duration_minutes": "-3", "day": 1000}]}),
            json!({"exercises": [{"sets": null, "reps": [], "day": {}}], "duration_days": 0}),
            json!({"exercises": [{}], "title": "", "difficulty": 3}),
        ];
        for doc in docs {
            let plan = normalize(&doc, &ctx()).plan;
            assert!(!plan.exercises.is_empty());
            assert!((1..=30).contains(&plan.duration_days));
            assert!(!plan.title.is_empty() && plan.title.chars().count() <= MAX_NAME_LEN);
            for ex in &plan.exercises {
                assert!((1..=20).contains(&ex.sets));
                assert!((1..=100).contains(&ex.reps));
                assert!((1..=180).contains(&ex.duration_minutes));
                assert!((1..=7).contains(&ex.day));
                assert!(!ex.name.is_empty());
            }
        }
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(
            extract_json("Here is your plan:\n```json\n{\"a\": [1]}\n```\nEnjoy!"),
            Some("{\"a\": [1]}")
        );
        assert_eq!(extract_json("Sure! {\"a\":1} Hope that helps."), Some("{\"a\":1}"));
        assert_eq!(extract_json("[1,2]"), Some("[1,2]"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_normalize_text() {
        let text = "```json\n{\"title\": \"Text Plan\", \"exercises\": [{\"name\": \"Mikan Drill\", \"category\": \"finishing\"}]}\n```";
        let out = normalize_text(text, &ctx());
        assert_eq!(out.plan.title, "Text Plan");
        assert_eq!(out.plan.exercises[0].category, ExerciseCategory::General);

        let out = normalize_text("{\"exercises\": [", &ctx());
        assert_eq!(out.provenance, PlanProvenance::Fallback);
    }

    #[test]
    fn test_plan_id_is_deterministic() {
        let a = normalize(&one_exercise(json!({})), &ctx());
        let b = normalize(&one_exercise(json!({})), &ctx());
        assert_eq!(a.plan.id, b.plan.id);
    }
}
