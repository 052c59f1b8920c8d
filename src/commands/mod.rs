//! Command-line surface: one subcommand per tracker operation.
//!
//! Handlers return plain data; the dispatcher renders it as JSON so the
//! output can be consumed by a UI host or a script.

pub mod achievements;
pub mod completions;
pub mod settings;
pub mod workouts;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::TrackerError;
use crate::tracker::FitnessTracker;

#[derive(Debug, Parser)]
#[command(name = "fit-daily", version, about = "Daily workout tracker")]
pub struct Cli {
  /// SQLite database file, overrides FIT_DAILY_DB_PATH
  #[arg(long, global = true)]
  pub db: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Manage workouts
  #[command(subcommand)]
  Workouts(workouts::WorkoutCommand),
  /// Manage the exercises of a workout
  #[command(subcommand)]
  Exercises(workouts::ExerciseCommand),
  /// Check or un-check an exercise for today
  Toggle { workout_id: String, exercise_id: String },
  /// Today's workouts with their progress
  Today,
  /// Remove every completion recorded today
  ResetToday,
  /// Attach a note to a completion record
  Note { completion_id: String, text: String },
  /// Current and longest streak
  Streak,
  /// Weekly goal
  #[command(subcommand)]
  Goal(achievements::GoalCommand),
  /// Achievement badges
  Badges,
  /// Weekly activity and totals
  Stats,
  /// Exercise history
  History {
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    exercise: Option<String>,
  },
  /// Step counter
  #[command(subcommand)]
  Steps(settings::StepsCommand),
  /// App settings
  #[command(subcommand)]
  Settings(settings::SettingsCommand),
  /// Workout reminders
  #[command(subcommand)]
  Reminders(settings::ReminderCommand),
}

pub async fn dispatch(tracker: &mut FitnessTracker, command: Command) -> Result<Value, String> {
  match command {
    Command::Workouts(cmd) => workouts::run_workout_command(tracker, cmd).await,
    Command::Exercises(cmd) => workouts::run_exercise_command(tracker, cmd).await,
    Command::Toggle {
      workout_id,
      exercise_id,
    } => respond(completions::toggle(tracker, &workout_id, &exercise_id).await),
    Command::Today => respond(Ok(completions::today(tracker))),
    Command::ResetToday => respond(tracker.reset_daily_progress().await),
    Command::Note {
      completion_id,
      text,
    } => respond(tracker.update_workout_note(&completion_id, &text).await),
    Command::Streak => respond(Ok(tracker.streak().clone())),
    Command::Goal(cmd) => achievements::run_goal_command(tracker, cmd).await,
    Command::Badges => respond(Ok(tracker.badges().to_vec())),
    Command::Stats => respond(Ok(tracker.stats())),
    Command::History { date, exercise } => respond(Ok(achievements::history(tracker, date, exercise.as_deref()))),
    Command::Steps(cmd) => settings::run_steps_command(tracker, cmd).await,
    Command::Settings(cmd) => settings::run_settings_command(tracker, cmd).await,
    Command::Reminders(cmd) => settings::run_reminder_command(tracker, cmd),
  }
}

/// Render a handler result as JSON, flattening errors to their message
pub fn respond<T: Serialize>(result: Result<T, TrackerError>) -> Result<Value, String> {
  let value = result.map_err(|e| e.to_string())?;
  serde_json::to_value(value).map_err(|e| format!("Failed to encode response: {}", e))
}
