//! Wall-clock access for the tracker.
//!
//! Every "today" in the core is the local calendar day of the clock's
//! current time, so the clock is injected rather than read ad hoc.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
  /// Current local time including its UTC offset
  fn now(&self) -> DateTime<FixedOffset>;

  /// Local calendar day
  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }

  fn now_utc(&self) -> DateTime<Utc> {
    self.now().with_timezone(&Utc)
  }
}

/// Reads the operating system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(now.offset())
  }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
  instant: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
  pub fn new(instant: DateTime<FixedOffset>) -> Self {
    Self {
      instant: Mutex::new(instant),
    }
  }

  /// Parse an RFC 3339 timestamp such as `2024-01-03T08:30:00+01:00`
  pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
    DateTime::parse_from_rfc3339(rfc3339).map(Self::new)
  }

  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut guard) = self.instant.lock() {
      *guard = *guard + by;
    }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<FixedOffset> {
    match self.instant.lock() {
      Ok(guard) => *guard,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, Timelike};

  #[test]
  fn test_fixed_clock_today_uses_local_offset() {
    // 23:30 at UTC-05:00 is already the next day in UTC
    let clock = FixedClock::parse("2024-01-03T23:30:00-05:00").unwrap();
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert_eq!(clock.now_utc().date_naive(), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
  }

  #[test]
  fn test_fixed_clock_advance() {
    let clock = FixedClock::parse("2024-01-03T06:00:00+00:00").unwrap();
    clock.advance(Duration::hours(20));
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    assert_eq!(clock.now().hour(), 2);
  }
}
