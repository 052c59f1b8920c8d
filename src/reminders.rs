//! Workout reminder planning and the notification capability.
//!
//! The planner is pure: given the current local time and the reminder
//! settings it computes the next trigger. Delivering the notification is
//! left to a [`NotificationScheduler`].

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};

pub const REMINDER_ID: u32 = 100;
pub const SNOOZE_ID: u32 = 101;
pub const SNOOZE_MINUTES: i64 = 10;
pub const CHANNEL_ID: &str = "workout-reminders";

// ---------------------------------------------------------------------------
// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
  #[error("Invalid reminder time '{0}', expected HH:MM")]
  InvalidTime(String),

  #[error("The selected date {0} has already passed")]
  PastDate(NaiveDate),

  #[error("Notifications aren't available on this device")]
  Unavailable,

  #[error("Failed to schedule reminder: {0}")]
  Scheduler(String),
}

impl Serialize for ReminderError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
  Day,
  Weekday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledReminder {
  pub id: u32,
  pub title: String,
  pub body: String,
  pub trigger_at: DateTime<FixedOffset>,
  /// `None` for one-shot reminders
  pub repeat: Option<RepeatInterval>,
  pub sound: String,
  pub vibration: bool,
  pub channel_id: String,
}

impl ScheduledReminder {
  /// Human-readable confirmation, e.g. "Daily workout reminder set for 7:05"
  pub fn summary(&self) -> String {
    let time = self.trigger_at.format("%-H:%M");
    match self.repeat {
      Some(RepeatInterval::Day) => format!("Daily workout reminder set for {}", time),
      Some(RepeatInterval::Weekday) => format!("Workout reminder set for {} on weekdays", time),
      None => format!(
        "One-time workout reminder set for {} at {}",
        self.trigger_at.date_naive(),
        time
      ),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest<'a> {
  /// Local wall-clock time, "HH:MM"
  pub time: &'a str,
  pub weekdays_only: bool,
  pub sound: &'a str,
  pub vibration: bool,
  /// One-shot reminder on this day instead of a repeating one
  pub specific_date: Option<NaiveDate>,
}

pub fn parse_reminder_time(time: &str) -> Result<NaiveTime, ReminderError> {
  NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| ReminderError::InvalidTime(time.to_string()))
}

/// Compute the next reminder relative to `now`.
///
/// Repeating reminders fire today if the time is still ahead, otherwise
/// tomorrow; with `weekdays_only` a weekend trigger moves to Monday.
pub fn plan_reminder(now: DateTime<FixedOffset>, request: &ReminderRequest<'_>) -> Result<ScheduledReminder, ReminderError> {
  let time = parse_reminder_time(request.time)?;
  let offset = *now.offset();
  let at = |date: NaiveDate| -> Result<DateTime<FixedOffset>, ReminderError> {
    date
      .and_time(time)
      .and_local_timezone(offset)
      .single()
      .ok_or_else(|| ReminderError::InvalidTime(request.time.to_string()))
  };

  let (trigger_at, repeat) = match request.specific_date {
    Some(date) => {
      let trigger_at = at(date)?;
      if trigger_at < now {
        return Err(ReminderError::PastDate(date));
      }
      (trigger_at, None)
    }
    None => {
      let mut trigger_at = at(now.date_naive())?;
      if trigger_at <= now {
        trigger_at = trigger_at + Duration::days(1);
      }

      if request.weekdays_only {
        trigger_at = match trigger_at.weekday() {
          Weekday::Sat => trigger_at + Duration::days(2),
          Weekday::Sun => trigger_at + Duration::days(1),
          _ => trigger_at,
        };
      }

      let repeat = if request.weekdays_only {
        RepeatInterval::Weekday
      } else {
        RepeatInterval::Day
      };
      (trigger_at, Some(repeat))
    }
  };

  Ok(ScheduledReminder {
    id: REMINDER_ID,
    title: "Time to work out!".to_string(),
    body: "Don't break your streak! It's time for your daily workout.".to_string(),
    trigger_at,
    repeat,
    sound: sound_name(request.sound),
    vibration: request.vibration,
    channel_id: CHANNEL_ID.to_string(),
  })
}

/// One-shot follow-up for the "snooze" notification action
pub fn plan_snooze(now: DateTime<FixedOffset>) -> ScheduledReminder {
  ScheduledReminder {
    id: SNOOZE_ID,
    title: "Workout Reminder".to_string(),
    body: "This is your snoozed reminder. Time to work out now!".to_string(),
    trigger_at: now + Duration::minutes(SNOOZE_MINUTES),
    repeat: None,
    sound: sound_name("default"),
    vibration: true,
    channel_id: CHANNEL_ID.to_string(),
  }
}

fn sound_name(selected: &str) -> String {
  match selected {
    "" | "default" => "notification".to_string(),
    other => other.to_string(),
  }
}

// ---------------------------------------------------------------------------
// Schedulers
// ---------------------------------------------------------------------------

pub trait NotificationScheduler: Send + Sync {
  fn name(&self) -> &'static str;

  fn is_available(&self) -> bool;

  fn schedule(&self, reminder: &ScheduledReminder) -> Result<(), ReminderError>;

  fn cancel_all(&self) -> Result<(), ReminderError>;

  /// Reminders waiting to fire
  fn pending(&self) -> Vec<ScheduledReminder> {
    Vec::new()
  }
}

/// Platform without local notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl NotificationScheduler for NoopScheduler {
  fn name(&self) -> &'static str {
    "none"
  }

  fn is_available(&self) -> bool {
    false
  }

  fn schedule(&self, _reminder: &ScheduledReminder) -> Result<(), ReminderError> {
    Err(ReminderError::Unavailable)
  }

  fn cancel_all(&self) -> Result<(), ReminderError> {
    Ok(())
  }
}

/// Keeps scheduled reminders in memory and logs them
#[derive(Debug, Default)]
pub struct SimulatedScheduler {
  pending: Mutex<Vec<ScheduledReminder>>,
}

impl SimulatedScheduler {
  pub fn new() -> Self {
    Self::default()
  }
}

impl NotificationScheduler for SimulatedScheduler {
  fn name(&self) -> &'static str {
    "simulated"
  }

  fn is_available(&self) -> bool {
    true
  }

  fn schedule(&self, reminder: &ScheduledReminder) -> Result<(), ReminderError> {
    let mut pending = self
      .pending
      .lock()
      .map_err(|e| ReminderError::Scheduler(e.to_string()))?;
    pending.retain(|r| r.id != reminder.id);
    pending.push(reminder.clone());
    info!(
      id = reminder.id,
      trigger_at = %reminder.trigger_at,
      repeat = ?reminder.repeat,
      "Reminder scheduled"
    );
    Ok(())
  }

  fn cancel_all(&self) -> Result<(), ReminderError> {
    let mut pending = self
      .pending
      .lock()
      .map_err(|e| ReminderError::Scheduler(e.to_string()))?;
    if !pending.is_empty() {
      debug!(count = pending.len(), "Cancelled pending reminders");
    }
    pending.clear();
    Ok(())
  }

  fn pending(&self) -> Vec<ScheduledReminder> {
    self.pending.lock().map(|p| p.clone()).unwrap_or_default()
  }
}
