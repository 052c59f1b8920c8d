use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::workout::{Exercise, ExerciseType};

/// Exercises checked off for one workout on one day.
/// At most one exists per (workout_id, date) and `completed_exercises` is never empty once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutCompletion {
  pub id: String,
  pub workout_id: String,
  pub date: NaiveDate,
  pub completed_exercises: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<FixedOffset>>,
}

impl WorkoutCompletion {
  pub fn contains(&self, exercise_id: &str) -> bool {
    self.completed_exercises.iter().any(|id| id == exercise_id)
  }
}

/// History entry for a single exercise check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseCompletion {
  pub id: String,
  pub exercise_id: String,
  pub workout_id: String,
  pub date: NaiveDate,
  pub timestamp: DateTime<FixedOffset>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sets: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reps: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub distance: Option<f64>,
}

impl ExerciseCompletion {
  /// Build a history entry from the checked exercise, copying its target into the matching slot
  pub fn from_exercise(id: String, workout_id: &str, exercise: &Exercise, detail: &ExerciseEventDetail) -> Self {
    let target = Some(exercise.target);
    Self {
      id,
      exercise_id: exercise.id.clone(),
      workout_id: workout_id.to_string(),
      date: detail.date,
      timestamp: detail.timestamp,
      sets: exercise.sets,
      reps: target.filter(|_| exercise.exercise_type == ExerciseType::Reps),
      time: target.filter(|_| exercise.exercise_type == ExerciseType::Time),
      distance: target.filter(|_| exercise.exercise_type == ExerciseType::Distance),
    }
  }
}

/// Payload shared by both completion events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEventDetail {
  pub workout_id: String,
  pub exercise_id: String,
  pub date: NaiveDate,
  pub timestamp: DateTime<FixedOffset>,
}

/// Emitted by the completion store after every successful toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "kebab-case")]
pub enum CompletionEvent {
  ExerciseCompleted(ExerciseEventDetail),
  ExerciseUncompleted(ExerciseEventDetail),
}

impl CompletionEvent {
  pub fn detail(&self) -> &ExerciseEventDetail {
    match self {
      Self::ExerciseCompleted(detail) | Self::ExerciseUncompleted(detail) => detail,
    }
  }

  pub fn is_completed(&self) -> bool {
    matches!(self, Self::ExerciseCompleted(_))
  }
}
