//! Achievement badges.
//!
//! Rules dispatch on badge type and requirement, so a new catalog entry of
//! an existing type needs no new code. Unlocks are permanent.

use chrono::{DateTime, Timelike, Utc};
use std::collections::HashSet;
use tracing::info;

use crate::models::{Badge, BadgeType, ExerciseCompletion, WorkoutCompletion};
use crate::streak::StreakData;

/// Inputs the rules are evaluated against
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
  pub streak: &'a StreakData,
  pub completions: &'a [WorkoutCompletion],
  pub history: &'a [ExerciseCompletion],
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeUpdate {
  pub badges: Vec<Badge>,
  pub newly_unlocked: Vec<Badge>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub fn default_badges() -> Vec<Badge> {
  vec![
    catalog_entry(
      "streak-5",
      "5-Day Streak",
      "Complete your exercises for 5 days in a row",
      "flame",
      BadgeType::Streak,
      5,
    ),
    catalog_entry(
      "exercises-10",
      "Exercise Variety",
      "Complete 10 unique exercises",
      "dumbbell",
      BadgeType::Exercise,
      10,
    ),
    catalog_entry(
      "early-bird",
      "7 AM Warrior",
      "Complete an exercise before 7 AM",
      "sunrise",
      BadgeType::Time,
      7,
    ),
  ]
}

fn catalog_entry(
  id: &str,
  name: &str,
  description: &str,
  icon: &str,
  badge_type: BadgeType,
  requirement: u32,
) -> Badge {
  Badge {
    id: id.to_string(),
    name: name.to_string(),
    description: description.to_string(),
    icon: icon.to_string(),
    unlocked: false,
    earned_date: None,
    badge_type,
    requirement,
  }
}

/// Combine stored badges with the catalog: catalog definitions win, stored
/// unlock state is kept, and stored badges unknown to the catalog are kept
/// as they are.
pub fn merge_with_catalog(stored: Vec<Badge>) -> Vec<Badge> {
  let mut merged: Vec<Badge> = default_badges()
    .into_iter()
    .map(|mut badge| {
      if let Some(saved) = stored.iter().find(|s| s.id == badge.id) {
        badge.unlocked = saved.unlocked;
        badge.earned_date = saved.earned_date;
      }
      badge
    })
    .collect();

  let known: HashSet<String> = merged.iter().map(|b| b.id.clone()).collect();
  merged.extend(stored.into_iter().filter(|s| !known.contains(&s.id)));
  merged
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Unlock every locked badge whose rule now holds.
///
/// `earned_date` is the evaluation time, not the moment of the qualifying
/// completion.
pub fn check_and_unlock_badges(badges: &[Badge], ctx: &BadgeContext<'_>, now: DateTime<Utc>) -> BadgeUpdate {
  let mut newly_unlocked = Vec::new();

  let badges = badges
    .iter()
    .map(|badge| {
      if badge.unlocked || !is_satisfied(badge, ctx) {
        return badge.clone();
      }

      let unlocked = Badge {
        unlocked: true,
        earned_date: Some(now),
        ..badge.clone()
      };
      info!(badge_id = %unlocked.id, name = %unlocked.name, "Badge unlocked");
      newly_unlocked.push(unlocked.clone());
      unlocked
    })
    .collect();

  BadgeUpdate {
    badges,
    newly_unlocked,
  }
}

fn is_satisfied(badge: &Badge, ctx: &BadgeContext<'_>) -> bool {
  match badge.badge_type {
    BadgeType::Streak => ctx.streak.current_streak >= badge.requirement,
    BadgeType::Exercise => distinct_exercise_count(ctx.completions) >= badge.requirement as usize,
    // Local hour of the device when the entry was logged
    BadgeType::Time => ctx
      .history
      .iter()
      .any(|entry| entry.timestamp.hour() < badge.requirement),
  }
}

pub fn distinct_exercise_count(completions: &[WorkoutCompletion]) -> usize {
  completions
    .iter()
    .flat_map(|c| c.completed_exercises.iter())
    .collect::<HashSet<_>>()
    .len()
}
