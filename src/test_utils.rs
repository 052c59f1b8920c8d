//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - In-memory store setup/teardown
//! - Mock data factories
//! - Pinned clocks

use crate::clock::{Clock, FixedClock};
use crate::completion::CompletionStore;
use crate::db::initialize_memory_db;
use crate::models::{new_id, ExerciseCompletion, WorkoutCompletion};
use crate::storage::KvStore;
use crate::tracker::{Capabilities, FitnessTracker};
use chrono::{DateTime, NaiveDate};
use std::sync::Arc;

/// Wednesday morning, UTC. The surrounding Sunday-aligned week runs
/// 2023-12-31 through 2024-01-06.
pub const TEST_NOW: &str = "2024-01-03T08:30:00+00:00";

// ---------------------------------------------------------------------------
// Store Test Utilities
// ---------------------------------------------------------------------------

/// Create an in-memory store with migrations applied
///
/// The pool holds a single connection; a second connection would open a
/// separate, empty in-memory database
pub async fn setup_test_store() -> KvStore {
  let pool = initialize_memory_db()
    .await
    .expect("Failed to create in-memory database");
  KvStore::new(pool)
}

/// Close a test store's pool
pub async fn teardown_test_store(store: KvStore) {
  store.pool().close().await;
}

/// Make every write of `key` fail from now on
pub async fn refuse_writes_to(store: &KvStore, key: &str) {
  let name = key.replace('-', "_");
  for operation in ["INSERT", "UPDATE"] {
    let sql = format!(
      "CREATE TRIGGER refuse_{operation}_{name} BEFORE {operation} ON kv_store \
       WHEN NEW.key = '{key}' BEGIN SELECT RAISE(ABORT, 'write refused'); END"
    );
    sqlx::query(&sql)
      .execute(store.pool())
      .await
      .expect("Failed to create trigger");
  }
}

/// Completion store on a fresh database with the clock pinned to [`TEST_NOW`]
pub async fn setup_test_completion_store() -> (CompletionStore, Arc<FixedClock>) {
  let kv = setup_test_store().await;
  let clock = fixed_clock(TEST_NOW);
  let store = CompletionStore::load(kv, clock.clone(), 5000)
    .await
    .expect("Failed to load completion store");
  (store, clock)
}

/// Tracker on a fresh database with no notification or step capabilities
pub async fn setup_test_tracker() -> (FitnessTracker, Arc<FixedClock>) {
  let kv = setup_test_store().await;
  let clock = fixed_clock(TEST_NOW);
  let tracker = FitnessTracker::load(kv, clock.clone(), Capabilities::disabled())
    .await
    .expect("Failed to load tracker");
  (tracker, clock)
}

// ---------------------------------------------------------------------------
// Mock Data Factories
// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM-DD` literal
pub fn date(value: &str) -> NaiveDate {
  NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("Invalid test date")
}

/// Completion record for `workout_id` on `date` with the given exercises checked
pub fn mock_completion(workout_id: &str, date: NaiveDate, exercises: &[&str]) -> WorkoutCompletion {
  WorkoutCompletion {
    id: new_id(),
    workout_id: workout_id.to_string(),
    date,
    completed_exercises: exercises.iter().map(|e| e.to_string()).collect(),
    notes: None,
    timestamp: None,
  }
}

/// History entry logged at an RFC 3339 instant
pub fn mock_history_entry(workout_id: &str, exercise_id: &str, at: &str) -> ExerciseCompletion {
  let timestamp = DateTime::parse_from_rfc3339(at).expect("Invalid test timestamp");
  ExerciseCompletion {
    id: new_id(),
    exercise_id: exercise_id.to_string(),
    workout_id: workout_id.to_string(),
    date: timestamp.date_naive(),
    timestamp,
    sets: None,
    reps: None,
    time: None,
    distance: None,
  }
}

// ---------------------------------------------------------------------------
// Time Helpers
// ---------------------------------------------------------------------------

pub fn fixed_clock(rfc3339: &str) -> Arc<FixedClock> {
  Arc::new(FixedClock::parse(rfc3339).expect("Invalid test clock"))
}

// ---------------------------------------------------------------------------
// Test Macros
// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

// ---------------------------------------------------------------------------
// Tests for Test Utilities
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_store_creates_schema() {
    let store = setup_test_store().await;

    let tables: Vec<(String,)> =
      sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = 'kv_store'")
        .fetch_all(store.pool())
        .await
        .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_store(store).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let completion = mock_completion("w1", date("2024-01-01"), &["e1", "e2"]);
    assert_eq!(completion.workout_id, "w1");
    assert_eq!(completion.completed_exercises, vec!["e1", "e2"]);

    let entry = mock_history_entry("w1", "e1", "2024-01-01T06:15:00+02:00");
    assert_eq!(entry.date, date("2024-01-01"));
  }

  #[test]
  fn test_fixed_clock_reports_test_day() {
    let clock = fixed_clock(TEST_NOW);
    assert_eq!(clock.today(), date("2024-01-03"));
  }
}
