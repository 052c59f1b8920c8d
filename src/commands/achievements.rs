use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

use super::respond;
use crate::models::{ExerciseCompletion, WeeklyGoal};
use crate::tracker::FitnessTracker;

#[derive(Debug, Subcommand)]
pub enum GoalCommand {
  /// Current week's goal and progress
  Show,
  /// Every stored weekly goal
  List,
  /// Set the number of distinct workouts targeted this week
  Set { target: u32 },
}

pub async fn run_goal_command(tracker: &mut FitnessTracker, command: GoalCommand) -> Result<Value, String> {
  match command {
    GoalCommand::Show => respond(Ok(goal_view(tracker.current_weekly_goal()))),
    GoalCommand::List => respond(Ok(tracker.weekly_goals().to_vec())),
    GoalCommand::Set { target } => respond(tracker.set_weekly_goal_target(target).await),
  }
}

#[derive(Debug, Serialize)]
pub struct GoalView {
  #[serde(flatten)]
  pub goal: WeeklyGoal,
  pub progress_pct: f64,
}

pub fn goal_view(goal: &WeeklyGoal) -> GoalView {
  GoalView {
    goal: goal.clone(),
    progress_pct: goal.progress_pct(),
  }
}

/// History entries, optionally narrowed to one day and/or one exercise
pub fn history(tracker: &FitnessTracker, date: Option<NaiveDate>, exercise_id: Option<&str>) -> Vec<ExerciseCompletion> {
  let entries: Vec<&ExerciseCompletion> = match (date, exercise_id) {
    (Some(date), _) => tracker.history_on(date),
    (None, Some(exercise_id)) => tracker.history_for_exercise(exercise_id),
    (None, None) => tracker.history().iter().collect(),
  };

  entries
    .into_iter()
    .filter(|e| exercise_id.map_or(true, |id| e.exercise_id == id))
    .cloned()
    .collect()
}
