//! Settings, step counter and reminder commands

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use super::respond;
use crate::error::TrackerError;
use crate::models::workout::{STEP_GOAL_EXERCISE_ID, STEP_GOAL_WORKOUT_ID};
use crate::models::AppSettings;
use crate::tracker::{FitnessTracker, SettingsReport};

#[derive(Debug, Subcommand)]
pub enum StepsCommand {
  /// Today's step count
  Show,
  /// Feed a cumulative sensor reading
  Record { reading: u64 },
  /// Take a reading from the configured step source
  Poll,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
  Show,
  /// Change one or more settings
  Set(SettingsArgs),
}

#[derive(Debug, Default, Args)]
pub struct SettingsArgs {
  #[arg(long)]
  pub reminder_enabled: Option<bool>,
  /// HH:MM, local time
  #[arg(long)]
  pub reminder_time: Option<String>,
  #[arg(long)]
  pub weekdays_only: Option<bool>,
  #[arg(long)]
  pub voice_cues: Option<bool>,
  #[arg(long)]
  pub vibration: Option<bool>,
  #[arg(long)]
  pub step_goal: Option<u64>,
  #[arg(long)]
  pub ringtone: Option<String>,
  #[arg(long)]
  pub priority: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ReminderCommand {
  /// Reminders waiting to fire
  List,
  /// One-time reminder on a given day at the configured time
  Once { date: NaiveDate },
  /// Remind again in ten minutes
  Snooze,
}

#[derive(Debug, Serialize)]
pub struct StepsView {
  pub steps: u64,
  pub goal: u64,
  pub goal_completed: bool,
}

pub async fn run_steps_command(tracker: &mut FitnessTracker, command: StepsCommand) -> Result<Value, String> {
  match command {
    StepsCommand::Show => respond(Ok(steps_view(tracker))),
    StepsCommand::Record { reading } => respond(tracker.record_step_reading(reading).await),
    StepsCommand::Poll => respond(tracker.poll_steps().await),
  }
}

pub async fn run_settings_command(tracker: &mut FitnessTracker, command: SettingsCommand) -> Result<Value, String> {
  match command {
    SettingsCommand::Show => respond(Ok(tracker.settings().clone())),
    SettingsCommand::Set(args) => respond(update_settings(tracker, args).await),
  }
}

pub fn run_reminder_command(tracker: &FitnessTracker, command: ReminderCommand) -> Result<Value, String> {
  match command {
    ReminderCommand::List => respond(Ok(tracker.pending_reminders())),
    ReminderCommand::Once { date } => respond(tracker.schedule_reminder_on(date)),
    ReminderCommand::Snooze => respond(tracker.snooze_reminder()),
  }
}

pub fn steps_view(tracker: &FitnessTracker) -> StepsView {
  StepsView {
    steps: tracker.steps_today(),
    goal: tracker.settings().daily_step_goal,
    goal_completed: tracker.is_exercise_completed(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID, tracker.today()),
  }
}

/// Apply the given flags on top of the current settings
pub async fn update_settings(tracker: &mut FitnessTracker, args: SettingsArgs) -> Result<SettingsReport, TrackerError> {
  let current = tracker.settings().clone();
  let next = AppSettings {
    reminder_enabled: args.reminder_enabled.unwrap_or(current.reminder_enabled),
    reminder_time: args.reminder_time.unwrap_or(current.reminder_time),
    weekdays_only: args.weekdays_only.unwrap_or(current.weekdays_only),
    voice_cues_enabled: args.voice_cues.unwrap_or(current.voice_cues_enabled),
    vibration_enabled: args.vibration.unwrap_or(current.vibration_enabled),
    daily_step_goal: args.step_goal.unwrap_or(current.daily_step_goal),
    selected_ringtone: args.ringtone.or(current.selected_ringtone),
    notification_priority: args.priority.or(current.notification_priority),
  };

  tracker.update_settings(next).await
}
