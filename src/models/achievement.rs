use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Target of distinct workouts for one Sunday-to-Saturday week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGoal {
  pub id: String,
  pub target_workouts: u32,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub completed_workouts: u32,
  pub is_achieved: bool,
}

impl WeeklyGoal {
  pub fn progress_pct(&self) -> f64 {
    if self.target_workouts == 0 {
      return 100.0;
    }
    ((self.completed_workouts as f64 / self.target_workouts as f64) * 100.0).min(100.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
  /// Current streak reaches `requirement` days
  Streak,
  /// `requirement` distinct exercises completed
  Exercise,
  /// Exercise logged before `requirement` o'clock local time
  Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub description: String,
  pub icon: String,
  pub unlocked: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub earned_date: Option<DateTime<Utc>>,
  #[serde(rename = "type")]
  pub badge_type: BadgeType,
  pub requirement: u32,
}
