//! Workout definitions and daily completion records.
//!
//! Holds the single source of truth for "what was done today". Every
//! mutation builds the next collection, persists it, and only then swaps it
//! into memory, so a failed write leaves the in-memory state untouched.
//!
//! Toggles and resets are two-step: `prepare_*` builds a [`CompletionChange`]
//! and `commit` writes it in one transaction with any other keys derived
//! from its events. Committed events are published on a broadcast channel;
//! the store does not know who listens.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, TrackerError};
use crate::models::workout::{STEP_GOAL_EXERCISE_ID, STEP_GOAL_WORKOUT_ID};
use crate::models::{
  new_id, CompletionEvent, Exercise, ExerciseEventDetail, ExerciseType, NewExercise, Workout,
  WorkoutCompletion,
};
use crate::storage::{encode, keys, KvStore};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Completion Store
// ---------------------------------------------------------------------------

pub struct CompletionStore {
  kv: KvStore,
  clock: Arc<dyn Clock>,
  workouts: Vec<Workout>,
  completions: Vec<WorkoutCompletion>,
  events: broadcast::Sender<CompletionEvent>,
}

/// Completion records after a toggle or reset, with the events the change
/// produces. Built by the store, applied with [`CompletionStore::commit`].
#[derive(Debug, Clone)]
pub struct CompletionChange {
  completions: Vec<WorkoutCompletion>,
  events: Vec<CompletionEvent>,
}

impl CompletionChange {
  pub fn events(&self) -> &[CompletionEvent] {
    &self.events
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }
}

impl CompletionStore {
  /// Load workouts and completions, seeding the sample workout on first
  /// launch and injecting the synthetic step-goal workout when missing.
  pub async fn load(kv: KvStore, clock: Arc<dyn Clock>, step_goal: u64) -> Result<Self> {
    let now = clock.now_utc();

    let mut workouts: Vec<Workout> = kv.load_or_default(keys::WORKOUTS).await?;
    let mut workouts_changed = false;

    if workouts.is_empty() {
      info!("No workouts stored, seeding sample workout");
      workouts.push(sample_workout(now));
      workouts_changed = true;
    }

    match workouts.iter().position(Workout::is_step_goal) {
      None => {
        debug!("Injecting step goal workout");
        workouts.push(Workout::step_goal(step_goal, now));
        workouts_changed = true;
      }
      Some(idx) => {
        let expected = Workout::step_goal(step_goal, now).exercises;
        if workouts[idx].exercises != expected {
          warn!(step_goal, "Step goal workout out of line with settings, restoring it");
          workouts[idx].exercises = expected;
          workouts_changed = true;
        }
      }
    }

    if workouts_changed {
      kv.save(keys::WORKOUTS, &workouts).await?;
    }

    let stored: Vec<WorkoutCompletion> = kv.load_or_default(keys::COMPLETIONS).await?;
    let (completions, normalized) = normalize_completions(stored);
    if normalized {
      warn!("Stored completions violated the one-record-per-day rule, repaired on load");
      kv.save(keys::COMPLETIONS, &completions).await?;
    }

    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    Ok(Self {
      kv,
      clock,
      workouts,
      completions,
      events,
    })
  }

  /// Receive every completion event published after this call
  pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
    self.events.subscribe()
  }

  pub fn workouts(&self) -> &[Workout] {
    &self.workouts
  }

  pub fn completions(&self) -> &[WorkoutCompletion] {
    &self.completions
  }

  pub fn workout(&self, workout_id: &str) -> Option<&Workout> {
    self.workouts.iter().find(|w| w.id == workout_id)
  }

  pub fn completion_for(&self, workout_id: &str, date: NaiveDate) -> Option<&WorkoutCompletion> {
    self
      .completions
      .iter()
      .find(|c| c.workout_id == workout_id && c.date == date)
  }

  pub fn is_exercise_completed(&self, workout_id: &str, exercise_id: &str, date: NaiveDate) -> bool {
    self
      .completion_for(workout_id, date)
      .is_some_and(|c| c.contains(exercise_id))
  }

  /// Share of the workout's exercises checked on `date`, 0-100
  pub fn workout_completion_percentage(&self, workout_id: &str, date: NaiveDate) -> f64 {
    let Some(workout) = self.workout(workout_id) else {
      return 0.0;
    };
    let Some(completion) = self.completion_for(workout_id, date) else {
      return 0.0;
    };

    let total = workout.exercises.len();
    if total == 0 {
      return 0.0;
    }
    (completion.completed_exercises.len() as f64 / total as f64) * 100.0
  }

  // -------------------------------------------------------------------------
  // Completion toggling
  // -------------------------------------------------------------------------

  /// Prepare checking or un-checking an exercise for today.
  ///
  /// Creates today's record on the first check and deletes it when the last
  /// exercise is un-checked. Unknown ids abort without any state change.
  /// Nothing is written until the change is passed to [`Self::commit`].
  pub fn prepare_toggle(&self, workout_id: &str, exercise_id: &str) -> Result<(CompletionChange, CompletionEvent)> {
    self.validate_reference(workout_id, exercise_id)?;

    let now = self.clock.now();
    let today = now.date_naive();
    let mut next = self.completions.clone();

    let completed = match next
      .iter()
      .position(|c| c.workout_id == workout_id && c.date == today)
    {
      None => {
        next.push(WorkoutCompletion {
          id: new_id(),
          workout_id: workout_id.to_string(),
          date: today,
          completed_exercises: vec![exercise_id.to_string()],
          notes: None,
          timestamp: Some(now),
        });
        true
      }
      Some(idx) if next[idx].contains(exercise_id) => {
        next[idx].completed_exercises.retain(|id| id != exercise_id);
        if next[idx].completed_exercises.is_empty() {
          next.remove(idx);
        }
        false
      }
      Some(idx) => {
        next[idx].completed_exercises.push(exercise_id.to_string());
        next[idx].timestamp = Some(now);
        true
      }
    };

    let detail = ExerciseEventDetail {
      workout_id: workout_id.to_string(),
      exercise_id: exercise_id.to_string(),
      date: today,
      timestamp: now,
    };
    let event = if completed {
      CompletionEvent::ExerciseCompleted(detail)
    } else {
      CompletionEvent::ExerciseUncompleted(detail)
    };

    debug!(workout_id, exercise_id, completed, "Prepared toggle");
    let change = CompletionChange {
      completions: next,
      events: vec![event.clone()],
    };
    Ok((change, event))
  }

  /// Prepare removing every completion recorded today, with one un-check
  /// event per removed exercise
  pub fn prepare_reset(&self) -> CompletionChange {
    let now = self.clock.now();
    let today = now.date_naive();

    let (removed, kept): (Vec<_>, Vec<_>) = self
      .completions
      .iter()
      .cloned()
      .partition(|c| c.date == today);

    let events = removed
      .iter()
      .flat_map(|completion| {
        completion.completed_exercises.iter().map(move |exercise_id| {
          CompletionEvent::ExerciseUncompleted(ExerciseEventDetail {
            workout_id: completion.workout_id.clone(),
            exercise_id: exercise_id.clone(),
            date: today,
            timestamp: now,
          })
        })
      })
      .collect();

    CompletionChange {
      completions: kept,
      events,
    }
  }

  /// Persist a prepared change together with `alongside`, in one
  /// transaction, then swap it in and publish its events
  pub async fn commit(&mut self, change: CompletionChange, alongside: &[(&str, String)]) -> Result<()> {
    let mut entries = vec![(keys::COMPLETIONS, encode(keys::COMPLETIONS, &change.completions)?)];
    entries.extend(alongside.iter().cloned());
    self.kv.save_batch(&entries).await?;

    self.completions = change.completions;
    for event in change.events {
      self.publish(event);
    }
    Ok(())
  }

  pub async fn update_workout_note(&mut self, completion_id: &str, note: &str) -> Result<()> {
    let mut next = self.completions.clone();
    let completion = next
      .iter_mut()
      .find(|c| c.id == completion_id)
      .ok_or_else(|| TrackerError::NotFound(format!("Completion {} not found", completion_id)))?;

    let trimmed = note.trim();
    completion.notes = if trimmed.is_empty() {
      None
    } else {
      Some(trimmed.to_string())
    };

    self.persist_completions(next).await
  }

  // -------------------------------------------------------------------------
  // Workout CRUD
  // -------------------------------------------------------------------------

  pub async fn add_workout(&mut self, name: &str, exercises: Vec<NewExercise>) -> Result<Workout> {
    let name = validate_name(name, "Workout")?;
    for exercise in &exercises {
      validate_new_exercise(exercise)?;
    }

    let now = self.clock.now_utc();
    let workout = Workout {
      id: new_id(),
      name,
      exercises: exercises
        .into_iter()
        .map(|e| e.into_exercise(new_id()))
        .collect(),
      created_at: now,
      updated_at: now,
    };

    let mut next = self.workouts.clone();
    next.push(workout.clone());
    self.persist_workouts(next).await?;

    info!(workout_id = %workout.id, name = %workout.name, "Created workout");
    Ok(workout)
  }

  /// Replace a workout's name and exercise list. Exercises dropped by the
  /// edit are also removed from that workout's completion records.
  pub async fn update_workout(&mut self, workout: Workout) -> Result<Workout> {
    reject_step_goal_edit(&workout.id)?;
    let name = validate_name(&workout.name, "Workout")?;
    let existing = self
      .workout(&workout.id)
      .ok_or_else(|| TrackerError::NotFound(format!("Workout {} not found", workout.id)))?;

    let updated = Workout {
      name,
      created_at: existing.created_at,
      updated_at: self.clock.now_utc(),
      ..workout
    };

    let keep: HashSet<&str> = updated.exercises.iter().map(|e| e.id.as_str()).collect();
    let next_completions = retain_exercises(&self.completions, &updated.id, |id| keep.contains(id));

    let next_workouts: Vec<Workout> = self
      .workouts
      .iter()
      .map(|w| if w.id == updated.id { updated.clone() } else { w.clone() })
      .collect();

    self.persist_both(next_workouts, next_completions).await?;
    info!(workout_id = %updated.id, "Updated workout");
    Ok(updated)
  }

  /// Delete a workout together with all of its completion records.
  /// Both collections are written in one transaction.
  pub async fn delete_workout(&mut self, workout_id: &str) -> Result<Workout> {
    reject_step_goal_edit(workout_id)?;

    let deleted = self
      .workout(workout_id)
      .cloned()
      .ok_or_else(|| TrackerError::NotFound(format!("Workout {} not found", workout_id)))?;

    let next_workouts: Vec<Workout> = self
      .workouts
      .iter()
      .filter(|w| w.id != workout_id)
      .cloned()
      .collect();
    let next_completions: Vec<WorkoutCompletion> = self
      .completions
      .iter()
      .filter(|c| c.workout_id != workout_id)
      .cloned()
      .collect();

    self.persist_both(next_workouts, next_completions).await?;
    info!(workout_id, name = %deleted.name, "Deleted workout");
    Ok(deleted)
  }

  // -------------------------------------------------------------------------
  // Exercise CRUD
  // -------------------------------------------------------------------------

  pub async fn add_exercise(&mut self, workout_id: &str, exercise: NewExercise) -> Result<Exercise> {
    reject_step_goal_edit(workout_id)?;
    validate_new_exercise(&exercise)?;
    let now = self.clock.now_utc();

    let mut next = self.workouts.clone();
    let workout = find_workout_mut(&mut next, workout_id)?;
    let created = exercise.into_exercise(new_id());
    workout.exercises.push(created.clone());
    workout.updated_at = now;

    self.persist_workouts(next).await?;
    debug!(workout_id, exercise_id = %created.id, "Added exercise");
    Ok(created)
  }

  pub async fn update_exercise(&mut self, workout_id: &str, exercise: Exercise) -> Result<()> {
    reject_step_goal_edit(workout_id)?;
    validate_name(&exercise.name, "Exercise")?;
    validate_target(exercise.target)?;
    let now = self.clock.now_utc();

    let mut next = self.workouts.clone();
    let workout = find_workout_mut(&mut next, workout_id)?;
    let slot = workout
      .exercises
      .iter_mut()
      .find(|e| e.id == exercise.id)
      .ok_or_else(|| {
        TrackerError::NotFound(format!("Exercise {} not found in workout {}", exercise.id, workout_id))
      })?;
    *slot = exercise;
    workout.updated_at = now;

    self.persist_workouts(next).await
  }

  /// Remove an exercise and strip it from the workout's completions,
  /// deleting records left with no exercises
  pub async fn delete_exercise(&mut self, workout_id: &str, exercise_id: &str) -> Result<()> {
    reject_step_goal_edit(workout_id)?;
    let now = self.clock.now_utc();

    let mut next_workouts = self.workouts.clone();
    let workout = find_workout_mut(&mut next_workouts, workout_id)?;
    let before = workout.exercises.len();
    workout.exercises.retain(|e| e.id != exercise_id);
    if workout.exercises.len() == before {
      return Err(TrackerError::NotFound(format!(
        "Exercise {} not found in workout {}",
        exercise_id, workout_id
      )));
    }
    workout.updated_at = now;

    let next_completions = retain_exercises(&self.completions, workout_id, |id| id != exercise_id);

    self.persist_both(next_workouts, next_completions).await?;
    debug!(workout_id, exercise_id, "Deleted exercise");
    Ok(())
  }

  /// Keep the synthetic step workout's target in line with the configured
  /// goal. `alongside` is written in the same transaction.
  pub async fn sync_step_goal(&mut self, step_goal: u64, alongside: &[(&str, String)]) -> Result<()> {
    let now = self.clock.now_utc();
    let expected = Workout::step_goal(step_goal, now).exercises;

    let mut next = self.workouts.clone();
    let workout = find_workout_mut(&mut next, STEP_GOAL_WORKOUT_ID)?;
    let changed = workout.exercises != expected;
    if changed {
      workout.exercises = expected;
      workout.updated_at = now;
    }

    let mut entries = alongside.to_vec();
    if changed {
      entries.push((keys::WORKOUTS, encode(keys::WORKOUTS, &next)?));
    }
    if entries.is_empty() {
      return Ok(());
    }

    self.kv.save_batch(&entries).await?;
    if changed {
      debug!(step_goal, "Step goal workout updated");
      self.workouts = next;
    }
    Ok(())
  }

  // -------------------------------------------------------------------------
  // Internals
  // -------------------------------------------------------------------------

  fn validate_reference(&self, workout_id: &str, exercise_id: &str) -> Result<()> {
    let Some(workout) = self.workout(workout_id) else {
      warn!(workout_id, exercise_id, "Toggle rejected: unknown workout");
      return Err(TrackerError::InvalidReference(format!(
        "Workout {} does not exist",
        workout_id
      )));
    };

    if workout.find_exercise(exercise_id).is_none() {
      warn!(workout_id, exercise_id, "Toggle rejected: unknown exercise");
      return Err(TrackerError::InvalidReference(format!(
        "Exercise {} is not part of workout {}",
        exercise_id, workout_id
      )));
    }

    Ok(())
  }

  fn publish(&self, event: CompletionEvent) {
    // No receivers is fine; nobody has subscribed yet
    if self.events.send(event).is_err() {
      debug!("Completion event dropped: no subscribers");
    }
  }

  async fn persist_completions(&mut self, next: Vec<WorkoutCompletion>) -> Result<()> {
    self.kv.save(keys::COMPLETIONS, &next).await?;
    self.completions = next;
    Ok(())
  }

  async fn persist_workouts(&mut self, next: Vec<Workout>) -> Result<()> {
    self.kv.save(keys::WORKOUTS, &next).await?;
    self.workouts = next;
    Ok(())
  }

  async fn persist_both(&mut self, workouts: Vec<Workout>, completions: Vec<WorkoutCompletion>) -> Result<()> {
    self
      .kv
      .save_batch(&[
        (keys::WORKOUTS, encode(keys::WORKOUTS, &workouts)?),
        (keys::COMPLETIONS, encode(keys::COMPLETIONS, &completions)?),
      ])
      .await?;
    self.workouts = workouts;
    self.completions = completions;
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Workout seeded for new users
pub fn sample_workout(now: DateTime<Utc>) -> Workout {
  let exercises = vec![
    NewExercise::new("Push-ups", ExerciseType::Reps, 10.0, Some(3)),
    NewExercise::new("Squats", ExerciseType::Reps, 15.0, Some(3)),
    NewExercise::new("Plank", ExerciseType::Time, 30.0, Some(3)),
  ];

  Workout {
    id: new_id(),
    name: "Quick Morning Workout".to_string(),
    exercises: exercises
      .into_iter()
      .map(|e| e.into_exercise(new_id()))
      .collect(),
    created_at: now,
    updated_at: now,
  }
}

/// Merge duplicate (workout, date) records and drop empty ones.
/// Returns the repaired list and whether anything changed.
pub fn normalize_completions(stored: Vec<WorkoutCompletion>) -> (Vec<WorkoutCompletion>, bool) {
  let original_len = stored.len();
  let mut changed = false;
  let mut merged: Vec<WorkoutCompletion> = Vec::with_capacity(original_len);

  for completion in stored {
    match merged
      .iter_mut()
      .find(|c| c.workout_id == completion.workout_id && c.date == completion.date)
    {
      Some(existing) => {
        changed = true;
        for exercise_id in completion.completed_exercises {
          if !existing.contains(&exercise_id) {
            existing.completed_exercises.push(exercise_id);
          }
        }
        if existing.notes.is_none() {
          existing.notes = completion.notes;
        }
        existing.timestamp = existing.timestamp.max(completion.timestamp);
      }
      None => {
        let mut completion = completion;
        let before = completion.completed_exercises.len();
        let mut seen = HashSet::new();
        completion
          .completed_exercises
          .retain(|id| seen.insert(id.clone()));
        changed |= completion.completed_exercises.len() != before;
        merged.push(completion);
      }
    }
  }

  merged.retain(|c| !c.completed_exercises.is_empty());
  changed |= merged.len() != original_len;
  (merged, changed)
}

fn retain_exercises<F>(completions: &[WorkoutCompletion], workout_id: &str, keep: F) -> Vec<WorkoutCompletion>
where
  F: Fn(&str) -> bool,
{
  completions
    .iter()
    .cloned()
    .filter_map(|mut c| {
      if c.workout_id == workout_id {
        c.completed_exercises.retain(|id| keep(id.as_str()));
        if c.completed_exercises.is_empty() {
          return None;
        }
      }
      Some(c)
    })
    .collect()
}

fn find_workout_mut<'a>(workouts: &'a mut [Workout], workout_id: &str) -> Result<&'a mut Workout> {
  workouts
    .iter_mut()
    .find(|w| w.id == workout_id)
    .ok_or_else(|| TrackerError::NotFound(format!("Workout {} not found", workout_id)))
}

/// The step goal workout follows the step goal setting and is never edited directly
fn reject_step_goal_edit(workout_id: &str) -> Result<()> {
  if workout_id == STEP_GOAL_WORKOUT_ID {
    return Err(TrackerError::Validation(
      "The step goal workout is managed by the daily step goal setting".to_string(),
    ));
  }
  Ok(())
}

fn validate_name(name: &str, what: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(TrackerError::Validation(format!("{} name cannot be empty", what)));
  }
  Ok(trimmed.to_string())
}

fn validate_target(target: f64) -> Result<()> {
  if !target.is_finite() || target <= 0.0 {
    return Err(TrackerError::Validation(format!(
      "Exercise target must be positive, got {}",
      target
    )));
  }
  Ok(())
}

fn validate_new_exercise(exercise: &NewExercise) -> Result<()> {
  validate_name(&exercise.name, "Exercise")?;
  validate_target(exercise.target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
