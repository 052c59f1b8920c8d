//! The tracker facade.
//!
//! Owns the completion store and every piece of derived state. Toggles and
//! resets are prepared by the store, folded into the history log, and
//! committed together with the history in one transaction. Streak, weekly
//! goal and badges are then recomputed, persisting whatever changed.
//! Callers get a report of what the mutation caused.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::badges::{check_and_unlock_badges, default_badges, merge_with_catalog, BadgeContext};
use crate::clock::Clock;
use crate::completion::{CompletionChange, CompletionStore};
use crate::error::{Result, TrackerError};
use crate::history::ExerciseHistory;
use crate::models::workout::{STEP_GOAL_EXERCISE_ID, STEP_GOAL_WORKOUT_ID};
use crate::models::{
  AppSettings, Badge, CompletionEvent, Exercise, ExerciseCompletion, NewExercise, StepData, WeeklyGoal, Workout,
  WorkoutCompletion,
};
use crate::reminders::{
  parse_reminder_time, plan_reminder, plan_snooze, NoopScheduler, NotificationScheduler, ReminderError,
  ReminderRequest, ScheduledReminder,
};
use crate::stats::{build_stats_summary, StatsSummary};
use crate::steps::{apply_reading, progress_pct, step_goal_reached, StepSource, UnavailableStepSource};
use crate::storage::{encode, keys, KvStore};
use crate::streak::{calculate_streak_data, StreakData};
use crate::weekly_goal::{evaluate_weekly_goal, set_weekly_goal_target};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Platform services the tracker can use when present
#[derive(Clone)]
pub struct Capabilities {
  pub scheduler: Arc<dyn NotificationScheduler>,
  pub step_source: Arc<dyn StepSource>,
}

impl Capabilities {
  pub fn disabled() -> Self {
    Self {
      scheduler: Arc::new(NoopScheduler),
      step_source: Arc::new(UnavailableStepSource),
    }
  }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Derived state after a mutation, with the transitions it caused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedUpdate {
  pub streak: StreakData,
  pub weekly_goal: WeeklyGoal,
  /// The weekly goal became achieved during this update
  pub weekly_goal_achieved: bool,
  pub unlocked_badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleReport {
  pub event: CompletionEvent,
  #[serde(flatten)]
  pub derived: DerivedUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
  pub date: NaiveDate,
  pub steps: u64,
  pub goal: u64,
  pub progress_pct: f64,
  /// Present when this reading completed the step goal
  pub goal_completed: Option<ToggleReport>,
}

#[derive(Debug, Serialize)]
pub struct SettingsReport {
  pub settings: AppSettings,
  /// Reminder now pending, if one was scheduled
  pub reminder: Option<ScheduledReminder>,
  /// Settings were saved but the reminder could not be (re)scheduled
  pub reminder_error: Option<ReminderError>,
}

// ---------------------------------------------------------------------------
// Fitness Tracker
// ---------------------------------------------------------------------------

pub struct FitnessTracker {
  kv: KvStore,
  clock: Arc<dyn Clock>,
  capabilities: Capabilities,
  store: CompletionStore,
  history: ExerciseHistory,
  weekly_goals: Vec<WeeklyGoal>,
  current_goal: WeeklyGoal,
  badges: Vec<Badge>,
  streak: StreakData,
  settings: AppSettings,
  steps: Option<StepData>,
}

impl FitnessTracker {
  pub async fn load(kv: KvStore, clock: Arc<dyn Clock>, capabilities: Capabilities) -> Result<Self> {
    let settings: AppSettings = kv.load_or_default(keys::SETTINGS).await?;
    let store = CompletionStore::load(kv.clone(), clock.clone(), settings.daily_step_goal).await?;

    let history = ExerciseHistory::new(kv.load_or_default(keys::EXERCISE_HISTORY).await?);
    let weekly_goals: Vec<WeeklyGoal> = kv.load_or_default(keys::WEEKLY_GOALS).await?;
    let badges = match kv.load::<Vec<Badge>>(keys::BADGES).await? {
      Some(stored) => merge_with_catalog(stored),
      None => default_badges(),
    };
    let steps: Option<StepData> = kv.load(keys::STEPS).await?;

    let today = clock.today();
    let streak = calculate_streak_data(store.completions(), today);
    let current_goal = evaluate_weekly_goal(&weekly_goals, store.completions(), today).current;

    let mut tracker = Self {
      kv,
      clock,
      capabilities,
      store,
      history,
      weekly_goals,
      current_goal,
      badges,
      streak,
      settings,
      steps,
    };

    tracker.refresh_derived().await?;
    info!(
      workouts = tracker.store.workouts().len(),
      completions = tracker.store.completions().len(),
      current_streak = tracker.streak.current_streak,
      "Tracker loaded"
    );
    Ok(tracker)
  }

  /// Receive completion events as they are committed
  pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
    self.store.subscribe()
  }

  // -------------------------------------------------------------------------
  // Queries
  // -------------------------------------------------------------------------

  pub fn workouts(&self) -> &[Workout] {
    self.store.workouts()
  }

  pub fn workout(&self, workout_id: &str) -> Option<&Workout> {
    self.store.workout(workout_id)
  }

  pub fn completions(&self) -> &[WorkoutCompletion] {
    self.store.completions()
  }

  pub fn completion_for(&self, workout_id: &str, date: NaiveDate) -> Option<&WorkoutCompletion> {
    self.store.completion_for(workout_id, date)
  }

  pub fn is_exercise_completed(&self, workout_id: &str, exercise_id: &str, date: NaiveDate) -> bool {
    self.store.is_exercise_completed(workout_id, exercise_id, date)
  }

  pub fn workout_completion_percentage(&self, workout_id: &str, date: NaiveDate) -> f64 {
    self.store.workout_completion_percentage(workout_id, date)
  }

  pub fn history(&self) -> &[ExerciseCompletion] {
    self.history.entries()
  }

  pub fn history_on(&self, date: NaiveDate) -> Vec<&ExerciseCompletion> {
    self.history.on_date(date)
  }

  pub fn history_for_exercise(&self, exercise_id: &str) -> Vec<&ExerciseCompletion> {
    self.history.for_exercise(exercise_id)
  }

  pub fn streak(&self) -> &StreakData {
    &self.streak
  }

  pub fn current_weekly_goal(&self) -> &WeeklyGoal {
    &self.current_goal
  }

  pub fn weekly_goals(&self) -> &[WeeklyGoal] {
    &self.weekly_goals
  }

  pub fn badges(&self) -> &[Badge] {
    &self.badges
  }

  pub fn settings(&self) -> &AppSettings {
    &self.settings
  }

  pub fn today(&self) -> NaiveDate {
    self.clock.today()
  }

  /// Steps counted today; a stale record from an earlier day counts as zero
  pub fn steps_today(&self) -> u64 {
    let today = self.clock.today();
    self
      .steps
      .as_ref()
      .filter(|s| s.date == today)
      .map(StepData::steps)
      .unwrap_or(0)
  }

  pub fn stats(&self) -> StatsSummary {
    build_stats_summary(self.store.completions(), &self.streak, self.clock.today())
  }

  // -------------------------------------------------------------------------
  // Completions
  // -------------------------------------------------------------------------

  pub async fn toggle_exercise_completion(&mut self, workout_id: &str, exercise_id: &str) -> Result<ToggleReport> {
    let (change, event) = self.store.prepare_toggle(workout_id, exercise_id)?;
    self.commit_change(change).await?;
    let derived = self.refresh_derived().await?;
    Ok(ToggleReport { event, derived })
  }

  /// Un-check everything done today
  pub async fn reset_daily_progress(&mut self) -> Result<DerivedUpdate> {
    let change = self.store.prepare_reset();
    if !change.is_empty() {
      let unchecked = change.events().len();
      self.commit_change(change).await?;
      info!(unchecked, "Reset today's progress");
    }
    self.refresh_derived().await
  }

  pub async fn update_workout_note(&mut self, completion_id: &str, note: &str) -> Result<()> {
    self.store.update_workout_note(completion_id, note).await
  }

  // -------------------------------------------------------------------------
  // Workouts and exercises
  // -------------------------------------------------------------------------

  pub async fn add_workout(&mut self, name: &str, exercises: Vec<NewExercise>) -> Result<Workout> {
    self.store.add_workout(name, exercises).await
  }

  pub async fn update_workout(&mut self, workout: Workout) -> Result<Workout> {
    let updated = self.store.update_workout(workout).await?;
    self.refresh_derived().await?;
    Ok(updated)
  }

  pub async fn delete_workout(&mut self, workout_id: &str) -> Result<DerivedUpdate> {
    self.store.delete_workout(workout_id).await?;
    self.refresh_derived().await
  }

  pub async fn add_exercise(&mut self, workout_id: &str, exercise: NewExercise) -> Result<Exercise> {
    self.store.add_exercise(workout_id, exercise).await
  }

  pub async fn update_exercise(&mut self, workout_id: &str, exercise: Exercise) -> Result<()> {
    self.store.update_exercise(workout_id, exercise).await
  }

  pub async fn delete_exercise(&mut self, workout_id: &str, exercise_id: &str) -> Result<DerivedUpdate> {
    self.store.delete_exercise(workout_id, exercise_id).await?;
    self.refresh_derived().await
  }

  // -------------------------------------------------------------------------
  // Weekly goal
  // -------------------------------------------------------------------------

  pub async fn set_weekly_goal_target(&mut self, target: u32) -> Result<DerivedUpdate> {
    let update = set_weekly_goal_target(&self.weekly_goals, self.store.completions(), self.clock.today(), target)?;

    self.kv.save(keys::WEEKLY_GOALS, &update.goals).await?;
    self.weekly_goals = update.goals;
    self.current_goal = update.current.clone();

    Ok(DerivedUpdate {
      streak: self.streak.clone(),
      weekly_goal: update.current,
      weekly_goal_achieved: update.newly_achieved,
      unlocked_badges: Vec::new(),
    })
  }

  // -------------------------------------------------------------------------
  // Steps
  // -------------------------------------------------------------------------

  /// Fold a cumulative sensor reading into today's count and complete the
  /// step goal exercise the first time the goal is reached
  pub async fn record_step_reading(&mut self, reading: u64) -> Result<StepReport> {
    let today = self.clock.today();
    let next = apply_reading(self.steps.as_ref(), today, reading);
    self.kv.save(keys::STEPS, &next).await?;

    let steps = next.steps();
    self.steps = Some(next);

    let goal = self.settings.daily_step_goal;
    let already_completed = self
      .store
      .is_exercise_completed(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID, today);

    let goal_completed = if step_goal_reached(steps, goal, already_completed) {
      info!(steps, goal, "Daily step goal reached");
      Some(
        self
          .toggle_exercise_completion(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID)
          .await?,
      )
    } else {
      None
    };

    Ok(StepReport {
      date: today,
      steps,
      goal,
      progress_pct: progress_pct(steps, goal),
      goal_completed,
    })
  }

  /// Take one reading from the step source, `None` without a sensor
  pub async fn poll_steps(&mut self) -> Result<Option<StepReport>> {
    let source = self.capabilities.step_source.clone();
    if !source.is_available() {
      debug!(source = source.name(), "Step counting unavailable");
      return Ok(None);
    }
    let Some(reading) = source.read() else {
      debug!(source = source.name(), "No step reading available");
      return Ok(None);
    };
    self.record_step_reading(reading).await.map(Some)
  }

  // -------------------------------------------------------------------------
  // Settings and reminders
  // -------------------------------------------------------------------------

  /// Persist settings together with the step workout, then bring the
  /// reminder in line.
  ///
  /// Scheduler failures do not undo the save; they come back in the report.
  pub async fn update_settings(&mut self, settings: AppSettings) -> Result<SettingsReport> {
    parse_reminder_time(&settings.reminder_time)?;
    if settings.daily_step_goal == 0 {
      return Err(TrackerError::Validation(
        "Daily step goal must be at least 1".to_string(),
      ));
    }

    let encoded = encode(keys::SETTINGS, &settings)?;
    self
      .store
      .sync_step_goal(settings.daily_step_goal, &[(keys::SETTINGS, encoded)])
      .await?;
    let previous = std::mem::replace(&mut self.settings, settings);
    info!("Settings saved");

    let (reminder, reminder_error) = if self.settings.reminder_changed(&previous) {
      match self.reschedule_reminder() {
        Ok(reminder) => (reminder, None),
        Err(e) => {
          warn!(error = %e, "Reminder could not be scheduled");
          (None, Some(e))
        }
      }
    } else {
      (None, None)
    };

    Ok(SettingsReport {
      settings: self.settings.clone(),
      reminder,
      reminder_error,
    })
  }

  /// One-shot reminder on `date` at the configured reminder time
  pub fn schedule_reminder_on(&self, date: NaiveDate) -> Result<ScheduledReminder> {
    let scheduler = &self.capabilities.scheduler;
    if !scheduler.is_available() {
      return Err(ReminderError::Unavailable.into());
    }

    let reminder = plan_reminder(
      self.clock.now(),
      &ReminderRequest {
        specific_date: Some(date),
        ..self.reminder_request()
      },
    )?;
    scheduler.cancel_all()?;
    scheduler.schedule(&reminder)?;
    Ok(reminder)
  }

  pub fn snooze_reminder(&self) -> Result<ScheduledReminder> {
    let reminder = plan_snooze(self.clock.now());
    self.capabilities.scheduler.schedule(&reminder)?;
    Ok(reminder)
  }

  pub fn pending_reminders(&self) -> Vec<ScheduledReminder> {
    self.capabilities.scheduler.pending()
  }

  fn reminder_request(&self) -> ReminderRequest<'_> {
    ReminderRequest {
      time: &self.settings.reminder_time,
      weekdays_only: self.settings.weekdays_only,
      sound: self.settings.ringtone(),
      vibration: self.settings.vibration_enabled,
      specific_date: None,
    }
  }

  fn reschedule_reminder(&self) -> std::result::Result<Option<ScheduledReminder>, ReminderError> {
    let scheduler = &self.capabilities.scheduler;
    scheduler.cancel_all()?;

    if !self.settings.reminder_enabled {
      debug!("Reminders disabled, pending reminders cancelled");
      return Ok(None);
    }
    if !scheduler.is_available() {
      return Err(ReminderError::Unavailable);
    }

    let reminder = plan_reminder(self.clock.now(), &self.reminder_request())?;
    scheduler.schedule(&reminder)?;
    info!(summary = %reminder.summary(), "Reminder rescheduled");
    Ok(Some(reminder))
  }

  // -------------------------------------------------------------------------
  // Derived state
  // -------------------------------------------------------------------------

  /// Fold a prepared change into the history log and commit both at once,
  /// so completions and history never disagree on disk
  async fn commit_change(&mut self, change: CompletionChange) -> Result<()> {
    let history = self.history.with_events(change.events(), self.store.workouts());

    let mut alongside = Vec::new();
    if history != self.history {
      alongside.push((keys::EXERCISE_HISTORY, encode(keys::EXERCISE_HISTORY, history.entries())?));
    }

    self.store.commit(change, &alongside).await?;
    self.history = history;
    Ok(())
  }

  /// Recompute streak, weekly goal and badges from the current completions
  pub async fn refresh_derived(&mut self) -> Result<DerivedUpdate> {
    let today = self.clock.today();
    let streak = calculate_streak_data(self.store.completions(), today);

    let goal_update = evaluate_weekly_goal(&self.weekly_goals, self.store.completions(), today);
    if goal_update.changed {
      self.kv.save(keys::WEEKLY_GOALS, &goal_update.goals).await?;
    }
    self.weekly_goals = goal_update.goals;
    self.current_goal = goal_update.current.clone();
    self.streak = streak.clone();

    let badge_update = check_and_unlock_badges(
      &self.badges,
      &BadgeContext {
        streak: &self.streak,
        completions: self.store.completions(),
        history: self.history.entries(),
      },
      self.clock.now_utc(),
    );
    if !badge_update.newly_unlocked.is_empty() {
      self.kv.save(keys::BADGES, &badge_update.badges).await?;
    }
    self.badges = badge_update.badges;

    Ok(DerivedUpdate {
      streak,
      weekly_goal: goal_update.current,
      weekly_goal_achieved: goal_update.newly_achieved,
      unlocked_badges: badge_update.newly_unlocked,
    })
  }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::FixedClock;
  use crate::models::ExerciseType;
  use crate::reminders::{RepeatInterval, SimulatedScheduler};
  use crate::steps::SimulatedStepSource;
  use crate::test_utils::{
    date, fixed_clock, refuse_writes_to, setup_test_store, setup_test_tracker, teardown_test_store, TEST_NOW,
  };
  use chrono::Duration;

  async fn tracker_with(capabilities: Capabilities, now: &str) -> (FitnessTracker, Arc<FixedClock>) {
    let kv = setup_test_store().await;
    let clock = fixed_clock(now);
    let tracker = FitnessTracker::load(kv, clock.clone(), capabilities)
      .await
      .expect("Should load tracker");
    (tracker, clock)
  }

  fn simulated() -> Capabilities {
    Capabilities {
      scheduler: Arc::new(SimulatedScheduler::new()),
      step_source: Arc::new(SimulatedStepSource::new(0, 3_000)),
    }
  }

  #[tokio::test]
  async fn test_load_initializes_derived_state() {
    let (tracker, _clock) = setup_test_tracker().await;

    assert_eq!(tracker.workouts().len(), 2);
    assert_eq!(tracker.badges().len(), 3);
    assert_eq!(tracker.streak(), &StreakData::default());
    assert_eq!(tracker.current_weekly_goal().start_date, date("2023-12-31"));
    assert_eq!(tracker.weekly_goals().len(), 1);
  }

  #[tokio::test]
  async fn test_toggle_feeds_history_and_streak() {
    // Arrange
    let (mut tracker, _clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();
    let exercise_id = sample.exercises[0].id.clone();

    // Act
    let report = tracker
      .toggle_exercise_completion(&sample.id, &exercise_id)
      .await
      .expect("Should toggle");

    // Assert
    assert!(report.event.is_completed());
    assert_eq!(report.derived.streak.current_streak, 1);
    assert_eq!(tracker.history().len(), 1);
    assert_eq!(tracker.history()[0].reps, Some(10.0));
    assert_eq!(tracker.current_weekly_goal().completed_workouts, 1);

    // Un-check removes the history entry and the streak
    let report = tracker
      .toggle_exercise_completion(&sample.id, &exercise_id)
      .await
      .expect("Should toggle");
    assert!(!report.event.is_completed());
    assert!(tracker.history().is_empty());
    assert_eq!(tracker.streak().current_streak, 0);
    assert!(tracker.completions().is_empty());
  }

  #[tokio::test]
  async fn test_external_subscriber_sees_events() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let mut rx = tracker.subscribe();
    let sample = tracker.workouts()[0].clone();

    tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[1].id)
      .await
      .unwrap();

    let event = rx.try_recv().expect("Should receive event");
    assert_eq!(event.detail().exercise_id, sample.exercises[1].id);
  }

  #[tokio::test]
  async fn test_weekly_goal_achievement_is_reported_once() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    tracker.set_weekly_goal_target(2).await.unwrap();
    let sample = tracker.workouts()[0].clone();

    let first = tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await
      .unwrap();
    assert!(!first.derived.weekly_goal_achieved);

    let second = tracker
      .toggle_exercise_completion(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID)
      .await
      .unwrap();
    assert!(second.derived.weekly_goal_achieved);
    assert!(tracker.current_weekly_goal().is_achieved);

    let third = tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[1].id)
      .await
      .unwrap();
    assert!(!third.derived.weekly_goal_achieved);
  }

  #[tokio::test]
  async fn test_early_morning_completion_unlocks_badge() {
    let (mut tracker, _clock) = tracker_with(Capabilities::disabled(), "2024-01-03T06:30:00+09:00").await;
    let sample = tracker.workouts()[0].clone();

    let report = tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await
      .unwrap();

    let ids: Vec<&str> = report.derived.unlocked_badges.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["early-bird"]);

    // Undoing the completion keeps the badge
    tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await
      .unwrap();
    let badge = tracker.badges().iter().find(|b| b.id == "early-bird").unwrap();
    assert!(badge.unlocked);
  }

  #[tokio::test]
  async fn test_streak_across_days() {
    let (mut tracker, clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();

    for _ in 0..3 {
      tracker
        .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
        .await
        .unwrap();
      clock.advance(Duration::days(1));
    }

    // The day after the last completion still counts
    let update = tracker.refresh_derived().await.unwrap();
    assert_eq!(update.streak.current_streak, 3);

    clock.advance(Duration::days(1));
    let update = tracker.refresh_derived().await.unwrap();
    assert_eq!(update.streak.current_streak, 0);
    assert_eq!(update.streak.longest_streak, 3);
  }

  #[tokio::test]
  async fn test_step_goal_completes_synthetic_exercise_once() {
    let (mut tracker, _clock) = setup_test_tracker().await;

    let first = tracker.record_step_reading(10_000).await.unwrap();
    assert_eq!(first.steps, 0);
    assert!(first.goal_completed.is_none());

    let reached = tracker.record_step_reading(15_000).await.unwrap();
    assert_eq!(reached.steps, 5_000);
    assert!(reached.goal_completed.is_some());

    let beyond = tracker.record_step_reading(16_000).await.unwrap();
    assert!(beyond.goal_completed.is_none());
    assert!(tracker.is_exercise_completed(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID, tracker.today()));
    assert_eq!(tracker.steps_today(), 6_000);
  }

  #[tokio::test]
  async fn test_poll_steps_uses_source() {
    let (mut tracker, _clock) = tracker_with(simulated(), TEST_NOW).await;

    assert_eq!(tracker.poll_steps().await.unwrap().unwrap().steps, 0);
    assert_eq!(tracker.poll_steps().await.unwrap().unwrap().steps, 3_000);

    let (mut without_sensor, _clock) = setup_test_tracker().await;
    assert!(without_sensor.poll_steps().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_delete_workout_recomputes_derived_state() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();
    tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await
      .unwrap();

    let update = tracker.delete_workout(&sample.id).await.unwrap();

    assert_eq!(update.streak.current_streak, 0);
    assert_eq!(update.weekly_goal.completed_workouts, 0);
    assert!(tracker.workout(&sample.id).is_none());
  }

  #[tokio::test]
  async fn test_update_settings_schedules_reminder() {
    let (mut tracker, _clock) = tracker_with(simulated(), TEST_NOW).await;
    let settings = AppSettings {
      reminder_enabled: true,
      reminder_time: "18:00".to_string(),
      weekdays_only: true,
      ..AppSettings::default()
    };

    let report = tracker.update_settings(settings).await.unwrap();

    let reminder = report.reminder.expect("Should schedule");
    assert_eq!(reminder.trigger_at.date_naive(), date("2024-01-03"));
    assert_eq!(reminder.repeat, Some(RepeatInterval::Weekday));
    assert_eq!(tracker.pending_reminders().len(), 1);

    // Disabling cancels without scheduling
    let disabled = AppSettings {
      reminder_enabled: false,
      ..tracker.settings().clone()
    };
    let report = tracker.update_settings(disabled).await.unwrap();
    assert!(report.reminder.is_none());
    assert!(tracker.pending_reminders().is_empty());
  }

  #[tokio::test]
  async fn test_scheduler_failure_keeps_settings_saved() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let settings = AppSettings {
      reminder_enabled: true,
      ..AppSettings::default()
    };

    let report = tracker.update_settings(settings).await.unwrap();

    assert!(matches!(report.reminder_error, Some(ReminderError::Unavailable)));
    assert!(tracker.settings().reminder_enabled);
    let stored: AppSettings = tracker.kv.load_or_default(keys::SETTINGS).await.unwrap();
    assert!(stored.reminder_enabled);
  }

  #[tokio::test]
  async fn test_invalid_settings_are_rejected_unsaved() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let settings = AppSettings {
      reminder_time: "late".to_string(),
      ..AppSettings::default()
    };

    let err = tracker.update_settings(settings).await.unwrap_err();

    assert!(matches!(err, TrackerError::Reminder(ReminderError::InvalidTime(_))));
    assert_eq!(tracker.settings(), &AppSettings::default());
  }

  #[tokio::test]
  async fn test_step_goal_change_updates_synthetic_workout() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let settings = AppSettings {
      daily_step_goal: 8_000,
      ..AppSettings::default()
    };

    tracker.update_settings(settings).await.unwrap();

    let exercise = tracker
      .workout(STEP_GOAL_WORKOUT_ID)
      .and_then(|w| w.find_exercise(STEP_GOAL_EXERCISE_ID))
      .unwrap();
    assert_eq!(exercise.target, 8_000.0);
    assert_eq!(exercise.exercise_type, ExerciseType::Reps);
  }

  #[tokio::test]
  async fn test_state_survives_reload() {
    let kv = setup_test_store().await;
    let clock = fixed_clock(TEST_NOW);
    let mut tracker = FitnessTracker::load(kv.clone(), clock.clone(), Capabilities::disabled())
      .await
      .unwrap();
    let sample = tracker.workouts()[0].clone();
    tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await
      .unwrap();
    tracker.set_weekly_goal_target(3).await.unwrap();

    let reloaded = FitnessTracker::load(kv.clone(), clock, Capabilities::disabled())
      .await
      .unwrap();

    assert_eq!(reloaded.workouts().len(), 2);
    assert_eq!(reloaded.completions().len(), 1);
    assert_eq!(reloaded.history().len(), 1);
    assert_eq!(reloaded.current_weekly_goal().target_workouts, 3);
    assert_eq!(reloaded.streak().current_streak, 1);

    teardown_test_store(kv).await;
  }

  #[tokio::test]
  async fn test_persistence_failure_leaves_state_unchanged() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();
    tracker.kv.pool().close().await;

    let result = tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await;

    assert!(matches!(result, Err(TrackerError::Storage(_))));
    assert!(tracker.completions().is_empty());
    assert!(tracker.history().is_empty());
  }

  #[tokio::test]
  async fn test_history_write_failure_rolls_back_toggle() {
    // Arrange
    let (mut tracker, _clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();
    refuse_writes_to(&tracker.kv, keys::EXERCISE_HISTORY).await;

    // Act
    let result = tracker
      .toggle_exercise_completion(&sample.id, &sample.exercises[0].id)
      .await;

    // Assert
    assert!(matches!(result, Err(TrackerError::Storage(_))));
    assert!(tracker.completions().is_empty());
    assert!(tracker.history().is_empty());
    let stored: Vec<WorkoutCompletion> = tracker.kv.load_or_default(keys::COMPLETIONS).await.unwrap();
    assert!(stored.is_empty(), "completions are not saved without their history");
  }

  #[tokio::test]
  async fn test_reset_clears_history_for_many_exercises() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let exercises: Vec<NewExercise> = (1..=70)
      .map(|i| NewExercise::new(&format!("Move {}", i), ExerciseType::Reps, 5.0, None))
      .collect();
    let circuit = tracker.add_workout("Long Circuit", exercises).await.unwrap();
    for exercise in &circuit.exercises {
      tracker
        .toggle_exercise_completion(&circuit.id, &exercise.id)
        .await
        .unwrap();
    }
    assert_eq!(tracker.history().len(), 70);

    tracker.reset_daily_progress().await.unwrap();

    assert!(tracker.completions().is_empty());
    assert!(tracker.history().is_empty());
    let stored: Vec<ExerciseCompletion> = tracker.kv.load_or_default(keys::EXERCISE_HISTORY).await.unwrap();
    assert!(stored.is_empty());
  }

  #[tokio::test]
  async fn test_step_goal_keeps_working_after_rejected_edit() {
    let (mut tracker, _clock) = setup_test_tracker().await;

    let err = tracker
      .delete_exercise(STEP_GOAL_WORKOUT_ID, STEP_GOAL_EXERCISE_ID)
      .await
      .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));

    tracker.record_step_reading(0).await.unwrap();
    let report = tracker.record_step_reading(6_000).await.unwrap();
    assert!(report.goal_completed.is_some());

    let settings = AppSettings {
      daily_step_goal: 8_000,
      ..AppSettings::default()
    };
    tracker.update_settings(settings).await.unwrap();
    let stored: AppSettings = tracker.kv.load_or_default(keys::SETTINGS).await.unwrap();
    assert_eq!(stored.daily_step_goal, 8_000);
    let stored_workouts: Vec<Workout> = tracker.kv.load_or_default(keys::WORKOUTS).await.unwrap();
    let step_workout = stored_workouts.iter().find(|w| w.is_step_goal()).unwrap();
    assert_eq!(step_workout.exercises[0].target, 8_000.0);
  }

  #[tokio::test]
  async fn test_settings_write_failure_leaves_step_workout_alone() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    refuse_writes_to(&tracker.kv, keys::SETTINGS).await;
    let settings = AppSettings {
      daily_step_goal: 9_000,
      ..AppSettings::default()
    };

    let result = tracker.update_settings(settings).await;

    assert!(matches!(result, Err(TrackerError::Storage(_))));
    assert_eq!(tracker.settings(), &AppSettings::default());
    let exercise = tracker
      .workout(STEP_GOAL_WORKOUT_ID)
      .and_then(|w| w.find_exercise(STEP_GOAL_EXERCISE_ID))
      .unwrap();
    assert_eq!(exercise.target, AppSettings::default().daily_step_goal as f64);
  }

  #[tokio::test]
  async fn test_one_time_reminder_and_snooze() {
    let (tracker, _clock) = tracker_with(simulated(), TEST_NOW).await;

    let reminder = tracker.schedule_reminder_on(date("2024-01-05")).unwrap();
    assert_eq!(reminder.repeat, None);

    let past = tracker.schedule_reminder_on(date("2024-01-01")).unwrap_err();
    assert!(matches!(past, TrackerError::Reminder(ReminderError::PastDate(_))));

    tracker.snooze_reminder().unwrap();
    assert_eq!(tracker.pending_reminders().len(), 2);
  }

  #[tokio::test]
  async fn test_stats_reflect_completions() {
    let (mut tracker, _clock) = setup_test_tracker().await;
    let sample = tracker.workouts()[0].clone();
    for exercise in &sample.exercises {
      tracker
        .toggle_exercise_completion(&sample.id, &exercise.id)
        .await
        .unwrap();
    }

    let stats = tracker.stats();

    assert_eq!(stats.total_workouts, 1);
    assert_eq!(stats.total_exercises, 3);
    assert_eq!(stats.week[2].exercises, 3);
  }
}
