//! Weekly goal evaluation.
//!
//! A week runs Sunday through Saturday. The goal counts distinct workouts
//! with at least one completion inside the week, so repeating the same
//! workout every day still counts once.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashSet;
use tracing::info;

use crate::error::{Result, TrackerError};
use crate::models::{new_id, WeeklyGoal, WorkoutCompletion};

pub const DEFAULT_WEEKLY_TARGET: u32 = 4;

/// Outcome of evaluating the goal list against the completions
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyGoalUpdate {
  pub goals: Vec<WeeklyGoal>,
  pub current: WeeklyGoal,
  /// The goal list differs from the input and must be persisted
  pub changed: bool,
  /// The current goal went from not achieved to achieved
  pub newly_achieved: bool,
}

/// Most recent Sunday on or before `today`, and the Saturday after it
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
  let offset = i64::from(today.weekday().num_days_from_sunday());
  let start = today - Duration::days(offset);
  (start, start + Duration::days(6))
}

pub fn count_distinct_workouts(completions: &[WorkoutCompletion], start: NaiveDate, end: NaiveDate) -> u32 {
  let distinct: HashSet<&str> = completions
    .iter()
    .filter(|c| c.date >= start && c.date <= end)
    .map(|c| c.workout_id.as_str())
    .collect();
  distinct.len() as u32
}

/// Ensure a goal exists for the current week and refresh its progress.
///
/// A new week's goal inherits the target of the most recently created goal.
/// Achievement is recomputed each time, so undoing a completion can take
/// the week back below its target.
pub fn evaluate_weekly_goal(
  goals: &[WeeklyGoal],
  completions: &[WorkoutCompletion],
  today: NaiveDate,
) -> WeeklyGoalUpdate {
  let (start, end) = week_bounds(today);
  let mut next = goals.to_vec();
  let mut changed = false;

  let idx = match next
    .iter()
    .position(|g| g.start_date == start && g.end_date == end)
  {
    Some(idx) => idx,
    None => {
      let target_workouts = next
        .last()
        .map(|g| g.target_workouts)
        .unwrap_or(DEFAULT_WEEKLY_TARGET);
      next.push(WeeklyGoal {
        id: new_id(),
        target_workouts,
        start_date: start,
        end_date: end,
        completed_workouts: 0,
        is_achieved: false,
      });
      info!(%start, %end, target_workouts, "Created weekly goal");
      changed = true;
      next.len() - 1
    }
  };

  let completed_workouts = count_distinct_workouts(completions, start, end);
  let goal = &mut next[idx];
  let was_achieved = goal.is_achieved;
  let is_achieved = completed_workouts >= goal.target_workouts;

  if goal.completed_workouts != completed_workouts || goal.is_achieved != is_achieved {
    goal.completed_workouts = completed_workouts;
    goal.is_achieved = is_achieved;
    changed = true;
  }

  let newly_achieved = is_achieved && !was_achieved;
  if newly_achieved {
    info!(completed_workouts, target = goal.target_workouts, "Weekly goal achieved");
  }

  let current = goal.clone();
  WeeklyGoalUpdate {
    goals: next,
    current,
    changed,
    newly_achieved,
  }
}

/// Change the current week's target and re-evaluate progress against it
pub fn set_weekly_goal_target(
  goals: &[WeeklyGoal],
  completions: &[WorkoutCompletion],
  today: NaiveDate,
  target: u32,
) -> Result<WeeklyGoalUpdate> {
  if target == 0 {
    return Err(TrackerError::Validation(
      "Weekly goal target must be at least 1".to_string(),
    ));
  }

  let base = evaluate_weekly_goal(goals, completions, today);
  let mut next = base.goals;
  if let Some(goal) = next.iter_mut().find(|g| g.id == base.current.id) {
    goal.target_workouts = target;
  }

  info!(target, "Weekly goal target updated");
  let mut update = evaluate_weekly_goal(&next, completions, today);
  update.changed = true;
  // Reaching the goal by lowering the target still counts as a transition
  update.newly_achieved = update.current.is_achieved && !base.current.is_achieved;
  Ok(update)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::{date, mock_completion};

  #[test]
  fn test_week_bounds_are_sunday_to_saturday() {
    // Arrange: 2024-01-03 is a Wednesday
    let (start, end) = week_bounds(date("2024-01-03"));

    // Assert
    assert_eq!(start, date("2023-12-31"));
    assert_eq!(end, date("2024-01-06"));

    // Sunday and Saturday map onto their own week
    assert_eq!(week_bounds(date("2023-12-31")).0, date("2023-12-31"));
    assert_eq!(week_bounds(date("2024-01-06")).0, date("2023-12-31"));
    assert_eq!(week_bounds(date("2024-01-07")).0, date("2024-01-07"));
  }

  #[test]
  fn test_distinct_workouts_below_target() {
    // Arrange
    let completions = vec![
      mock_completion("w1", date("2024-01-01"), &["e1"]),
      mock_completion("w2", date("2024-01-02"), &["e2"]),
      mock_completion("w1", date("2024-01-03"), &["e1"]),
    ];

    // Act
    let update = evaluate_weekly_goal(&[], &completions, date("2024-01-03"));

    // Assert
    assert_eq!(update.current.target_workouts, DEFAULT_WEEKLY_TARGET);
    assert_eq!(update.current.completed_workouts, 2);
    assert!(!update.current.is_achieved);
    assert!(update.changed);
    assert_approx_eq!(update.current.progress_pct(), 50.0, 0.001);
  }

  #[test]
  fn test_same_workout_all_week_counts_once() {
    let completions: Vec<_> = (0..7)
      .map(|i| mock_completion("w1", date("2023-12-31") + Duration::days(i), &["e1"]))
      .collect();

    let update = evaluate_weekly_goal(&[], &completions, date("2024-01-06"));

    assert_eq!(update.current.completed_workouts, 1);
  }

  #[test]
  fn test_completions_outside_week_are_ignored() {
    let completions = vec![
      mock_completion("w1", date("2023-12-30"), &["e1"]),
      mock_completion("w2", date("2024-01-07"), &["e1"]),
    ];

    let update = evaluate_weekly_goal(&[], &completions, date("2024-01-03"));

    assert_eq!(update.current.completed_workouts, 0);
  }

  #[test]
  fn test_new_week_inherits_last_target() {
    // Arrange: last week's goal had a custom target
    let previous = evaluate_weekly_goal(&[], &[], date("2023-12-27"));
    let previous = set_weekly_goal_target(&previous.goals, &[], date("2023-12-27"), 2).unwrap();

    // Act
    let update = evaluate_weekly_goal(&previous.goals, &[], date("2024-01-03"));

    // Assert
    assert_eq!(update.goals.len(), 2);
    assert_eq!(update.current.target_workouts, 2);
    assert_eq!(update.current.start_date, date("2023-12-31"));
  }

  #[test]
  fn test_achievement_transition_and_undo() {
    let today = date("2024-01-03");
    let goals = set_weekly_goal_target(&[], &[], today, 2).unwrap().goals;

    let mut completions = vec![mock_completion("w1", today, &["e1"])];
    let update = evaluate_weekly_goal(&goals, &completions, today);
    assert!(!update.newly_achieved);

    completions.push(mock_completion("w2", today, &["e2"]));
    let achieved = evaluate_weekly_goal(&update.goals, &completions, today);
    assert!(achieved.newly_achieved);
    assert!(achieved.current.is_achieved);

    // Unchanged inputs report nothing new
    let again = evaluate_weekly_goal(&achieved.goals, &completions, today);
    assert!(!again.changed);
    assert!(!again.newly_achieved);

    // Undoing a workout drops the goal back below target
    completions.pop();
    let undone = evaluate_weekly_goal(&achieved.goals, &completions, today);
    assert!(!undone.current.is_achieved);
    assert!(undone.changed);
  }

  #[test]
  fn test_zero_target_is_rejected() {
    let err = set_weekly_goal_target(&[], &[], date("2024-01-03"), 0).unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
  }

  #[test]
  fn test_lowering_target_can_achieve_goal() {
    let today = date("2024-01-03");
    let completions = vec![mock_completion("w1", today, &["e1"])];
    let base = evaluate_weekly_goal(&[], &completions, today);

    let update = set_weekly_goal_target(&base.goals, &completions, today, 1).unwrap();

    assert!(update.newly_achieved);
    assert_eq!(update.goals.len(), 1);
  }
}
