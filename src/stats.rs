use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::WorkoutCompletion;
use crate::streak::StreakData;

// ---------------------------------------------------------------------------
// Stats Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
  pub date: NaiveDate,
  /// Short weekday label, "Mon".."Sun"
  pub label: String,
  /// Completion records on this day
  pub workouts: u32,
  /// Exercises checked across those records
  pub exercises: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
  /// Monday through Sunday of the current week
  pub week: Vec<DayActivity>,
  pub total_workouts: u32,
  pub total_exercises: u32,
  pub active_days: u32,
  pub current_streak: u32,
  pub longest_streak: u32,
}

/// Monday on or before `today`
pub fn monday_of(today: NaiveDate) -> NaiveDate {
  today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

pub fn build_stats_summary(completions: &[WorkoutCompletion], streak: &StreakData, today: NaiveDate) -> StatsSummary {
  let monday = monday_of(today);

  let week = (0..7)
    .map(|offset| {
      let date = monday + Duration::days(offset);
      let on_day = completions.iter().filter(|c| c.date == date);
      DayActivity {
        date,
        label: date.format("%a").to_string(),
        workouts: on_day.clone().count() as u32,
        exercises: on_day.map(|c| c.completed_exercises.len() as u32).sum(),
      }
    })
    .collect();

  StatsSummary {
    week,
    total_workouts: completions.len() as u32,
    total_exercises: completions
      .iter()
      .map(|c| c.completed_exercises.len() as u32)
      .sum(),
    active_days: streak.streak_dates.len() as u32,
    current_streak: streak.current_streak,
    longest_streak: streak.longest_streak,
  }
}
