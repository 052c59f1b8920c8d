use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_GOAL: u64 = 5000;
pub const DEFAULT_REMINDER_TIME: &str = "07:00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
  pub reminder_enabled: bool,
  /// Local wall-clock time, "HH:MM"
  pub reminder_time: String,
  pub weekdays_only: bool,
  pub voice_cues_enabled: bool,
  pub vibration_enabled: bool,
  pub daily_step_goal: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub selected_ringtone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notification_priority: Option<String>,
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      reminder_enabled: false,
      reminder_time: DEFAULT_REMINDER_TIME.to_string(),
      weekdays_only: false,
      voice_cues_enabled: false,
      vibration_enabled: true,
      daily_step_goal: DEFAULT_STEP_GOAL,
      selected_ringtone: None,
      notification_priority: None,
    }
  }
}

impl AppSettings {
  pub fn ringtone(&self) -> &str {
    self.selected_ringtone.as_deref().unwrap_or("default")
  }

  /// Whether switching from `previous` to `self` requires re-scheduling the reminder
  pub fn reminder_changed(&self, previous: &AppSettings) -> bool {
    self.reminder_enabled != previous.reminder_enabled
      || self.reminder_time != previous.reminder_time
      || self.weekdays_only != previous.weekdays_only
      || self.vibration_enabled != previous.vibration_enabled
      || self.ringtone() != previous.ringtone()
  }
}

/// Step counter state for one day. The sensor reports a cumulative count;
/// today's steps are the distance from the day's baseline plus whatever was
/// counted before the sensor last reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepData {
  pub date: NaiveDate,
  pub count: u64,
  pub baseline_count: u64,
  #[serde(default)]
  pub carried_over: u64,
}

impl StepData {
  pub fn new_day(date: NaiveDate, reading: u64) -> Self {
    Self {
      date,
      count: reading,
      baseline_count: reading,
      carried_over: 0,
    }
  }

  pub fn steps(&self) -> u64 {
    self.carried_over + self.count.saturating_sub(self.baseline_count)
  }
}
