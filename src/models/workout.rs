use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the synthetic workout that stands in for the daily step goal
pub const STEP_GOAL_WORKOUT_ID: &str = "daily-step-goal";
/// Id of the single exercise inside the synthetic step workout
pub const STEP_GOAL_EXERCISE_ID: &str = "daily-step-goal-exercise";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
  /// Target is a rep count
  Reps,
  /// Target is seconds
  Time,
  /// Target is meters
  Distance,
}

impl std::fmt::Display for ExerciseType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Reps => write!(f, "reps"),
      Self::Time => write!(f, "time"),
      Self::Distance => write!(f, "distance"),
    }
  }
}

impl std::str::FromStr for ExerciseType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "reps" => Ok(Self::Reps),
      "time" => Ok(Self::Time),
      "distance" => Ok(Self::Distance),
      _ => Err(format!("Unknown exercise type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub exercise_type: ExerciseType,
  pub target: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sets: Option<u32>,
}

/// For adding exercises (without id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExercise {
  pub name: String,
  #[serde(rename = "type")]
  pub exercise_type: ExerciseType,
  pub target: f64,
  #[serde(default)]
  pub sets: Option<u32>,
}

impl NewExercise {
  pub fn new(name: &str, exercise_type: ExerciseType, target: f64, sets: Option<u32>) -> Self {
    Self {
      name: name.to_string(),
      exercise_type,
      target,
      sets,
    }
  }

  pub fn into_exercise(self, id: String) -> Exercise {
    Exercise {
      id,
      name: self.name,
      exercise_type: self.exercise_type,
      target: self.target,
      sets: self.sets,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
  pub id: String,
  pub name: String,
  pub exercises: Vec<Exercise>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Workout {
  pub fn find_exercise(&self, exercise_id: &str) -> Option<&Exercise> {
    self.exercises.iter().find(|e| e.id == exercise_id)
  }

  pub fn is_step_goal(&self) -> bool {
    self.id == STEP_GOAL_WORKOUT_ID
  }

  /// Synthetic workout whose only exercise is "reach today's step goal"
  pub fn step_goal(step_goal: u64, now: DateTime<Utc>) -> Self {
    Self {
      id: STEP_GOAL_WORKOUT_ID.to_string(),
      name: "Daily Step Goal".to_string(),
      exercises: vec![Exercise {
        id: STEP_GOAL_EXERCISE_ID.to_string(),
        name: format!("Walk {} steps", step_goal),
        exercise_type: ExerciseType::Reps,
        target: step_goal as f64,
        sets: Some(1),
      }],
      created_at: now,
      updated_at: now,
    }
  }
}
