//! Per-exercise history log.
//!
//! Fed exclusively by completion events: a check appends an entry, an
//! un-check removes the matching entries for that day. Entries are never edited.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{new_id, CompletionEvent, ExerciseCompletion, Workout};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseHistory {
  entries: Vec<ExerciseCompletion>,
}

impl ExerciseHistory {
  pub fn new(entries: Vec<ExerciseCompletion>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[ExerciseCompletion] {
    &self.entries
  }

  pub fn for_exercise(&self, exercise_id: &str) -> Vec<&ExerciseCompletion> {
    self
      .entries
      .iter()
      .filter(|e| e.exercise_id == exercise_id)
      .collect()
  }

  pub fn on_date(&self, date: NaiveDate) -> Vec<&ExerciseCompletion> {
    self.entries.iter().filter(|e| e.date == date).collect()
  }

  /// History after applying every event in order
  pub fn with_events(&self, events: &[CompletionEvent], workouts: &[Workout]) -> Self {
    events.iter().fold(self.clone(), |history, event| {
      history.with_event(event, workouts).unwrap_or(history)
    })
  }

  /// History after applying `event`, or `None` when the event changes nothing
  pub fn with_event(&self, event: &CompletionEvent, workouts: &[Workout]) -> Option<Self> {
    let detail = event.detail();

    match event {
      CompletionEvent::ExerciseCompleted(_) => {
        let Some(exercise) = workouts
          .iter()
          .find(|w| w.id == detail.workout_id)
          .and_then(|w| w.find_exercise(&detail.exercise_id))
        else {
          warn!(
            workout_id = %detail.workout_id,
            exercise_id = %detail.exercise_id,
            "Completed exercise no longer exists, not logging history"
          );
          return None;
        };

        let mut entries = self.entries.clone();
        entries.push(ExerciseCompletion::from_exercise(
          new_id(),
          &detail.workout_id,
          exercise,
          detail,
        ));
        debug!(exercise_id = %detail.exercise_id, "Logged exercise history entry");
        Some(Self { entries })
      }
      CompletionEvent::ExerciseUncompleted(_) => {
        let entries: Vec<ExerciseCompletion> = self
          .entries
          .iter()
          .filter(|e| {
            !(e.workout_id == detail.workout_id && e.exercise_id == detail.exercise_id && e.date == detail.date)
          })
          .cloned()
          .collect();

        if entries.len() == self.entries.len() {
          return None;
        }
        debug!(exercise_id = %detail.exercise_id, "Removed exercise history entry");
        Some(Self { entries })
      }
    }
  }
}
