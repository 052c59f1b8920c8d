//! Workout and exercise management commands

use clap::Subcommand;
use serde_json::Value;

use super::respond;
use crate::error::TrackerError;
use crate::models::{ExerciseType, NewExercise};
use crate::tracker::FitnessTracker;

#[derive(Debug, Subcommand)]
pub enum WorkoutCommand {
  /// List every workout
  List,
  /// Create a workout
  Add {
    name: String,
    /// Exercise as NAME:TYPE:TARGET[:SETS], e.g. "Push-ups:reps:10:3"
    #[arg(long = "exercise", value_parser = parse_exercise_arg)]
    exercises: Vec<NewExercise>,
  },
  /// Rename a workout
  Rename { workout_id: String, name: String },
  /// Delete a workout and its completion records
  Delete { workout_id: String },
}

#[derive(Debug, Subcommand)]
pub enum ExerciseCommand {
  /// Append an exercise to a workout
  Add {
    workout_id: String,
    #[arg(value_parser = parse_exercise_arg)]
    exercise: NewExercise,
  },
  /// Change an exercise in place
  Update {
    workout_id: String,
    exercise_id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    exercise_type: Option<ExerciseType>,
    #[arg(long)]
    target: Option<f64>,
    #[arg(long)]
    sets: Option<u32>,
  },
  /// Remove an exercise and strip it from completions
  Delete { workout_id: String, exercise_id: String },
}

pub async fn run_workout_command(tracker: &mut FitnessTracker, command: WorkoutCommand) -> Result<Value, String> {
  match command {
    WorkoutCommand::List => respond(Ok(tracker.workouts().to_vec())),
    WorkoutCommand::Add { name, exercises } => respond(tracker.add_workout(&name, exercises).await),
    WorkoutCommand::Rename { workout_id, name } => respond(rename_workout(tracker, &workout_id, &name).await),
    WorkoutCommand::Delete { workout_id } => respond(tracker.delete_workout(&workout_id).await),
  }
}

pub async fn run_exercise_command(tracker: &mut FitnessTracker, command: ExerciseCommand) -> Result<Value, String> {
  match command {
    ExerciseCommand::Add { workout_id, exercise } => respond(tracker.add_exercise(&workout_id, exercise).await),
    ExerciseCommand::Update {
      workout_id,
      exercise_id,
      name,
      exercise_type,
      target,
      sets,
    } => {
      let patch = ExercisePatch {
        name,
        exercise_type,
        target,
        sets,
      };
      respond(update_exercise(tracker, &workout_id, &exercise_id, patch).await)
    }
    ExerciseCommand::Delete {
      workout_id,
      exercise_id,
    } => respond(tracker.delete_exercise(&workout_id, &exercise_id).await),
  }
}

/// Fields to overwrite on an existing exercise
#[derive(Debug, Default)]
pub struct ExercisePatch {
  pub name: Option<String>,
  pub exercise_type: Option<ExerciseType>,
  pub target: Option<f64>,
  pub sets: Option<u32>,
}

pub async fn rename_workout(
  tracker: &mut FitnessTracker,
  workout_id: &str,
  name: &str,
) -> Result<crate::models::Workout, TrackerError> {
  let mut workout = tracker
    .workout(workout_id)
    .cloned()
    .ok_or_else(|| TrackerError::NotFound(format!("Workout {} not found", workout_id)))?;
  workout.name = name.to_string();
  tracker.update_workout(workout).await
}

pub async fn update_exercise(
  tracker: &mut FitnessTracker,
  workout_id: &str,
  exercise_id: &str,
  patch: ExercisePatch,
) -> Result<crate::models::Exercise, TrackerError> {
  let mut exercise = tracker
    .workout(workout_id)
    .and_then(|w| w.find_exercise(exercise_id))
    .cloned()
    .ok_or_else(|| {
      TrackerError::NotFound(format!("Exercise {} not found in workout {}", exercise_id, workout_id))
    })?;

  if let Some(name) = patch.name {
    exercise.name = name;
  }
  if let Some(exercise_type) = patch.exercise_type {
    exercise.exercise_type = exercise_type;
  }
  if let Some(target) = patch.target {
    exercise.target = target;
  }
  if patch.sets.is_some() {
    exercise.sets = patch.sets;
  }

  tracker.update_exercise(workout_id, exercise.clone()).await?;
  Ok(exercise)
}

/// Parse `NAME:TYPE:TARGET[:SETS]`
pub fn parse_exercise_arg(value: &str) -> Result<NewExercise, String> {
  let parts: Vec<&str> = value.split(':').map(str::trim).collect();
  let (name, exercise_type, target, sets) = match parts.as_slice() {
    [name, exercise_type, target] => (*name, *exercise_type, *target, None),
    [name, exercise_type, target, sets] => (*name, *exercise_type, *target, Some(*sets)),
    _ => return Err(format!("Expected NAME:TYPE:TARGET[:SETS], got '{}'", value)),
  };

  let exercise_type: ExerciseType = exercise_type.parse()?;
  let target: f64 = target
    .parse()
    .map_err(|_| format!("Invalid target '{}'", target))?;
  let sets = sets
    .map(|s| s.parse::<u32>().map_err(|_| format!("Invalid sets '{}'", s)))
    .transpose()?;

  Ok(NewExercise::new(name, exercise_type, target, sets))
}
