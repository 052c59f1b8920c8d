//! Streak calculation over the completion history.
//!
//! Any workout completed on a day makes that day active. The current
//! streak only survives while the latest active day is today or yesterday.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::WorkoutCompletion;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakData {
  pub current_streak: u32,
  pub longest_streak: u32,
  pub last_completion_date: Option<NaiveDate>,
  /// Distinct active days, most recent first
  pub streak_dates: Vec<NaiveDate>,
}

/// Derive streak data from every completion record, relative to `today`
pub fn calculate_streak_data(completions: &[WorkoutCompletion], today: NaiveDate) -> StreakData {
  let distinct: BTreeSet<NaiveDate> = completions
    .iter()
    .filter(|c| !c.completed_exercises.is_empty())
    .map(|c| c.date)
    .collect();
  let sorted_dates: Vec<NaiveDate> = distinct.into_iter().rev().collect();

  let Some(&last) = sorted_dates.first() else {
    return StreakData::default();
  };

  let longest_run = longest_streak(&sorted_dates);

  // Streak is broken for the present, history keeps its peak
  if last != today && (today - last).num_days() > 1 {
    return StreakData {
      current_streak: 0,
      longest_streak: longest_run,
      last_completion_date: Some(last),
      streak_dates: sorted_dates,
    };
  }

  let mut current_streak = 1;
  let mut expected = last;
  for date in sorted_dates.iter().skip(1) {
    expected = expected - Duration::days(1);
    if *date != expected {
      break;
    }
    current_streak += 1;
  }

  StreakData {
    current_streak,
    longest_streak: longest_run.max(current_streak),
    last_completion_date: Some(last),
    streak_dates: sorted_dates,
  }
}

/// Longest run of consecutive days in a descending, de-duplicated date list
fn longest_streak(sorted_desc: &[NaiveDate]) -> u32 {
  if sorted_desc.is_empty() {
    return 0;
  }

  let mut longest = 1;
  let mut run = 1;
  for pair in sorted_desc.windows(2) {
    if (pair[0] - pair[1]).num_days() == 1 {
      run += 1;
      longest = longest.max(run);
    } else {
      run = 1;
    }
  }
  longest
}
