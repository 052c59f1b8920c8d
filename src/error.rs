use serde::Serialize;

use crate::reminders::ReminderError;
use crate::storage::StorageError;

// ---------------------------------------------------------------------------
// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  #[error("Invalid reference: {0}")]
  InvalidReference(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Validation failed: {0}")]
  Validation(String),

  #[error(transparent)]
  Storage(#[from] StorageError),

  #[error(transparent)]
  Reminder(#[from] ReminderError),
}

impl Serialize for TrackerError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_serializes_as_message() {
    let err = TrackerError::Validation("Weekly target must be at least 1".to_string());

    let json = serde_json::to_value(&err).unwrap();

    assert_eq!(json, serde_json::json!("Validation failed: Weekly target must be at least 1"));
  }

  #[test]
  fn test_reminder_error_passes_through() {
    let err: TrackerError = ReminderError::Unavailable.into();
    let result: Result<()> = Err(err);

    let message = serde_json::to_string(&result.unwrap_err()).unwrap();
    assert!(message.contains("available"));
  }
}
