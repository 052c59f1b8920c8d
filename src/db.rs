use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::storage::StorageError;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, StorageError> {
  // Create directory if it doesn't exist
  if let Some(parent) = db_path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  run_migrations(&pool).await?;

  info!("Database initialized successfully");
  Ok(pool)
}

/// Open a private in-memory database.
///
/// Uses max_connections(1) because every new connection to `sqlite::memory:`
/// would otherwise see its own empty database.
pub async fn initialize_memory_db() -> Result<DbPool, StorageError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await?;

  run_migrations(&pool).await?;
  Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), StorageError> {
  sqlx::migrate!("./migrations").run(pool).await?;
  Ok(())
}
