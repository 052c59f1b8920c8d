//! Runtime configuration read from the environment (and `.env`).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::reminders::{NoopScheduler, SimulatedScheduler};
use crate::steps::{SimulatedStepSource, UnavailableStepSource};
use crate::tracker::Capabilities;

pub const DB_PATH_VAR: &str = "FIT_DAILY_DB_PATH";
pub const STEP_SOURCE_VAR: &str = "FIT_DAILY_STEP_SOURCE";
pub const NOTIFICATIONS_VAR: &str = "FIT_DAILY_NOTIFICATIONS";

pub const DEFAULT_DB_PATH: &str = "fit-daily.db";

/// Steps added per read by the simulated pedometer
const SIMULATED_STRIDE: u64 = 250;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value '{value}' for {var}, expected one of: {expected}")]
  InvalidValue {
    var: &'static str,
    value: String,
    expected: &'static str,
  },
}

// ---------------------------------------------------------------------------
// Capability Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepSourceKind {
  Simulated,
  #[default]
  Unavailable,
}

impl fmt::Display for StepSourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StepSourceKind::Simulated => write!(f, "simulated"),
      StepSourceKind::Unavailable => write!(f, "unavailable"),
    }
  }
}

impl FromStr for StepSourceKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "simulated" => Ok(StepSourceKind::Simulated),
      "unavailable" | "none" => Ok(StepSourceKind::Unavailable),
      _ => Err(ConfigError::InvalidValue {
        var: STEP_SOURCE_VAR,
        value: s.to_string(),
        expected: "simulated, unavailable",
      }),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationMode {
  Simulated,
  #[default]
  Disabled,
}

impl fmt::Display for NotificationMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotificationMode::Simulated => write!(f, "simulated"),
      NotificationMode::Disabled => write!(f, "disabled"),
    }
  }
}

impl FromStr for NotificationMode {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "simulated" => Ok(NotificationMode::Simulated),
      "disabled" | "none" | "off" => Ok(NotificationMode::Disabled),
      _ => Err(ConfigError::InvalidValue {
        var: NOTIFICATIONS_VAR,
        value: s.to_string(),
        expected: "simulated, disabled",
      }),
    }
  }
}

// ---------------------------------------------------------------------------
// Tracker Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
  pub db_path: PathBuf,
  pub step_source: StepSourceKind,
  pub notifications: NotificationMode,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      db_path: PathBuf::from(DEFAULT_DB_PATH),
      step_source: StepSourceKind::default(),
      notifications: NotificationMode::default(),
    }
  }
}

impl TrackerConfig {
  /// Unset variables fall back to defaults; set but unrecognised values are errors
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let db_path = env::var(DB_PATH_VAR)
      .ok()
      .filter(|v| !v.trim().is_empty())
      .map(PathBuf::from)
      .unwrap_or(defaults.db_path);

    let step_source = match env::var(STEP_SOURCE_VAR) {
      Ok(value) => value.parse()?,
      Err(_) => defaults.step_source,
    };

    let notifications = match env::var(NOTIFICATIONS_VAR) {
      Ok(value) => value.parse()?,
      Err(_) => defaults.notifications,
    };

    Ok(Self {
      db_path,
      step_source,
      notifications,
    })
  }

  /// Build the configured capabilities. A simulated step sensor resumes
  /// from `last_step_reading` so counts keep growing across runs.
  pub fn capabilities(&self, last_step_reading: u64) -> Capabilities {
    Capabilities {
      scheduler: match self.notifications {
        NotificationMode::Simulated => Arc::new(SimulatedScheduler::new()),
        NotificationMode::Disabled => Arc::new(NoopScheduler),
      },
      step_source: match self.step_source {
        StepSourceKind::Simulated => Arc::new(SimulatedStepSource::new(last_step_reading, SIMULATED_STRIDE)),
        StepSourceKind::Unavailable => Arc::new(UnavailableStepSource),
      },
    }
  }
}
