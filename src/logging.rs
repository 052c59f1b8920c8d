//! Tracing subscriber setup for the command-line driver

use std::env;
use std::io;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
  Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
  /// Filter directive used when RUST_LOG is unset
  pub level: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      format: LogFormat::Compact,
    }
  }
}

impl LoggingConfig {
  pub fn from_env() -> Self {
    let defaults = Self::default();
    let level = env::var("RUST_LOG").unwrap_or(defaults.level);

    let format = match env::var("LOG_FORMAT").as_deref() {
      Ok("json") => LogFormat::Json,
      Ok("pretty") => LogFormat::Pretty,
      _ => defaults.format,
    };

    Self { level, format }
  }

  /// Install the global subscriber. Logs go to stderr so command output on
  /// stdout stays machine-readable.
  pub fn init(&self) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
      .or_else(|_| EnvFilter::try_new(&self.level))
      .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match self.format {
      LogFormat::Json => registry
        .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
        .try_init()?,
      LogFormat::Pretty => registry
        .with(fmt::layer().pretty().with_target(true).with_writer(io::stderr))
        .try_init()?,
      LogFormat::Compact => registry
        .with(fmt::layer().compact().with_target(false).with_writer(io::stderr))
        .try_init()?,
    }

    debug!(level = %self.level, format = ?self.format, "Logging initialized");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_from_env_reads_format_and_level() {
    temp_env::with_vars(
      [("RUST_LOG", Some("fit_daily_lib=debug")), ("LOG_FORMAT", Some("json"))],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config.level, "fit_daily_lib=debug");
        assert_eq!(config.format, LogFormat::Json);
      },
    );
  }

  #[test]
  #[serial]
  fn test_unknown_format_falls_back_to_compact() {
    temp_env::with_vars(
      [("RUST_LOG", None::<&str>), ("LOG_FORMAT", Some("xml"))],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config, LoggingConfig::default());
      },
    );
  }
}
