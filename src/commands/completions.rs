use chrono::NaiveDate;
use serde::Serialize;

use crate::error::TrackerError;
use crate::models::ExerciseType;
use crate::tracker::{FitnessTracker, ToggleReport};

#[derive(Debug, Serialize)]
pub struct TodayView {
  pub date: NaiveDate,
  pub workouts: Vec<TodayWorkout>,
  pub steps: u64,
  pub step_goal: u64,
}

#[derive(Debug, Serialize)]
pub struct TodayWorkout {
  pub id: String,
  pub name: String,
  pub completion_pct: f64,
  pub completion_id: Option<String>,
  pub exercises: Vec<TodayExercise>,
}

#[derive(Debug, Serialize)]
pub struct TodayExercise {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub exercise_type: ExerciseType,
  pub target: f64,
  pub sets: Option<u32>,
  pub completed: bool,
}

pub async fn toggle(
  tracker: &mut FitnessTracker,
  workout_id: &str,
  exercise_id: &str,
) -> Result<ToggleReport, TrackerError> {
  tracker.toggle_exercise_completion(workout_id, exercise_id).await
}

pub fn today(tracker: &FitnessTracker) -> TodayView {
  let date = tracker.today();

  let workouts = tracker
    .workouts()
    .iter()
    .map(|workout| TodayWorkout {
      id: workout.id.clone(),
      name: workout.name.clone(),
      completion_pct: tracker.workout_completion_percentage(&workout.id, date),
      completion_id: tracker.completion_for(&workout.id, date).map(|c| c.id.clone()),
      exercises: workout
        .exercises
        .iter()
        .map(|exercise| TodayExercise {
          id: exercise.id.clone(),
          name: exercise.name.clone(),
          exercise_type: exercise.exercise_type,
          target: exercise.target,
          sets: exercise.sets,
          completed: tracker.is_exercise_completed(&workout.id, &exercise.id, date),
        })
        .collect(),
    })
    .collect();

  TodayView {
    date,
    workouts,
    steps: tracker.steps_today(),
    step_goal: tracker.settings().daily_step_goal,
  }
}
