//! Logged workout sessions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One logged workout session, as handed over by the progress log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub completed: bool,

    /// Self-reported accuracy for the session (0-100)
    pub overall_accuracy: f64,

    pub calories_burned: u32,

    /// Minutes spent on the session
    pub completion_time: u32,

    pub shots_made: u32,
    pub shots_attempted: u32,

    /// Calendar day the session was performed on
    pub date: NaiveDate,
}

impl SessionRecord {
    /// Completed session with only the date set.
    pub fn completed_on(date: NaiveDate) -> Self {
        Self {
            completed: true,
            overall_accuracy: 0.0,
            calories_burned: 0,
            completion_time: 0,
            shots_made: 0,
            shots_attempted: 0,
            date,
        }
    }

    pub fn with_shots(mut self, made: u32, attempted: u32) -> Self {
        self.shots_made = made;
        self.shots_attempted = attempted;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.overall_accuracy = accuracy;
        self
    }

    pub fn with_calories(mut self, calories: u32) -> Self {
        self.calories_burned = calories;
        self
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.completion_time = minutes;
        self
    }

    /// Accuracy from shot counts, if any shots were taken.
    pub fn shot_accuracy(&self) -> Option<f64> {
        if self.shots_attempted == 0 {
            None
        } else {
            Some(self.shots_made as f64 / self.shots_attempted as f64 * 100.0)
        }
    }
}
