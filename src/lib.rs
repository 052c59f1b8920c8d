pub mod badges;
pub mod clock;
pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod reminders;
pub mod stats;
pub mod steps;
pub mod storage;
pub mod streak;
pub mod tracker;
pub mod weekly_goal;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use clock::SystemClock;
use commands::Cli;
use config::TrackerConfig;
use logging::LoggingConfig;
use models::StepData;
use storage::{keys, KvStore};
use tracker::FitnessTracker;

pub use error::{Result, TrackerError};

/// Entry point for the `fit-daily` binary
pub async fn run() -> ExitCode {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  if let Err(e) = LoggingConfig::from_env().init() {
    eprintln!("Failed to initialize logging: {}", e);
  }

  let mut config = match TrackerConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("Invalid configuration: {}", e);
      return ExitCode::FAILURE;
    }
  };
  if let Some(db_path) = cli.db {
    config.db_path = db_path;
  }

  let pool = match db::initialize_db(&config.db_path).await {
    Ok(pool) => pool,
    Err(e) => {
      eprintln!("Failed to initialize database: {}", e);
      return ExitCode::FAILURE;
    }
  };

  let kv = KvStore::new(pool.clone());
  let last_step_reading = match kv.load::<StepData>(keys::STEPS).await {
    Ok(steps) => steps.map_or(0, |s| s.count),
    Err(e) => {
      warn!(error = %e, "Could not read stored steps");
      0
    }
  };
  let capabilities = config.capabilities(last_step_reading);

  let mut tracker = match FitnessTracker::load(kv, Arc::new(SystemClock), capabilities).await {
    Ok(tracker) => tracker,
    Err(e) => {
      eprintln!("Failed to load tracker: {}", e);
      pool.close().await;
      return ExitCode::FAILURE;
    }
  };

  let mut events = tracker.subscribe();
  let outcome = commands::dispatch(&mut tracker, cli.command).await;
  pool.close().await;

  loop {
    match events.try_recv() {
      Ok(event) => info!(?event, "Completion event"),
      Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Completion events skipped"),
      Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
    }
  }

  match outcome.and_then(|value| {
    serde_json::to_string_pretty(&value).map_err(|e| format!("Failed to encode response: {}", e))
  }) {
    Ok(output) => {
      println!("{}", output);
      ExitCode::SUCCESS
    }
    Err(e) => {
      eprintln!("Error: {}", e);
      ExitCode::FAILURE
    }
  }
}
