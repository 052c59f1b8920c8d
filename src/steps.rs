//! Step counting and the daily step goal.
//!
//! Sensors report a cumulative count that only resets on reboot, so the
//! day's steps are tracked against a baseline captured at the first
//! reading of the day.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::models::StepData;

// ---------------------------------------------------------------------------
// Step Sources
// ---------------------------------------------------------------------------

pub trait StepSource: Send + Sync {
  fn name(&self) -> &'static str;

  fn is_available(&self) -> bool;

  /// Cumulative count since the sensor last reset, `None` when no sensor
  fn read(&self) -> Option<u64>;
}

/// Pretends to be a pedometer: every read walks `stride` more steps
#[derive(Debug)]
pub struct SimulatedStepSource {
  count: AtomicU64,
  stride: u64,
}

impl SimulatedStepSource {
  pub fn new(start: u64, stride: u64) -> Self {
    Self {
      count: AtomicU64::new(start),
      stride,
    }
  }
}

impl StepSource for SimulatedStepSource {
  fn name(&self) -> &'static str {
    "simulated"
  }

  fn is_available(&self) -> bool {
    true
  }

  fn read(&self) -> Option<u64> {
    Some(self.count.fetch_add(self.stride, Ordering::Relaxed) + self.stride)
  }
}

/// Device without a step sensor
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStepSource;

impl StepSource for UnavailableStepSource {
  fn name(&self) -> &'static str {
    "unavailable"
  }

  fn is_available(&self) -> bool {
    false
  }

  fn read(&self) -> Option<u64> {
    None
  }
}

// ---------------------------------------------------------------------------
// Step Accounting
// ---------------------------------------------------------------------------

/// Fold a cumulative sensor reading into the stored step data
pub fn apply_reading(previous: Option<&StepData>, today: NaiveDate, reading: u64) -> StepData {
  let Some(previous) = previous.filter(|p| p.date == today) else {
    debug!(%today, reading, "Starting step count for new day");
    return StepData::new_day(today, reading);
  };

  if reading < previous.count {
    // Sensor restarted from zero; keep what was already counted today
    info!(reading, stored = previous.count, "Step sensor reset detected");
    return StepData {
      date: today,
      count: reading,
      baseline_count: 0,
      carried_over: previous.steps(),
    };
  }

  StepData {
    count: reading,
    ..previous.clone()
  }
}

/// Whether the synthetic step exercise should be checked now
pub fn step_goal_reached(steps: u64, goal: u64, already_completed: bool) -> bool {
  goal > 0 && steps >= goal && !already_completed
}

pub fn progress_pct(steps: u64, goal: u64) -> f64 {
  if goal == 0 {
    return 100.0;
  }
  ((steps as f64 / goal as f64) * 100.0).min(100.0)
}
