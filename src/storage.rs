//! Key-value persistence for the tracker's collections.
//!
//! Each collection is one JSON document under a fixed key in the
//! `kv_store` table. Writes are last-write-wins; multi-key writes go
//! through a single transaction.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::DbPool;

// ---------------------------------------------------------------------------
// Storage Keys
// ---------------------------------------------------------------------------

pub mod keys {
  pub const WORKOUTS: &str = "workouts";
  pub const COMPLETIONS: &str = "completions";
  pub const EXERCISE_HISTORY: &str = "exercise-history";
  pub const WEEKLY_GOALS: &str = "weekly-goals";
  pub const BADGES: &str = "badges";
  pub const SETTINGS: &str = "settings";
  pub const STEPS: &str = "steps";
}

const UPSERT_SQL: &str = r#"
  INSERT INTO kv_store (key, value, updated_at)
  VALUES (?1, ?2, ?3)
  ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    updated_at = excluded.updated_at
"#;

// ---------------------------------------------------------------------------
// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Storage I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Failed to serialize '{key}': {source}")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

// ---------------------------------------------------------------------------
// Key-Value Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct KvStore {
  pool: DbPool,
}

impl KvStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  pub async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  pub async fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
    sqlx::query(UPSERT_SQL)
      .bind(key)
      .bind(value)
      .bind(Utc::now().to_rfc3339())
      .execute(&self.pool)
      .await?;
    debug!(key, bytes = value.len(), "Saved key");
    Ok(())
  }

  /// Load and decode a value. Corrupt JSON is treated as absent so callers
  /// fall back to their defaults instead of failing to start.
  pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = self.get_raw(key).await? else {
      return Ok(None);
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        warn!(key, error = %e, "Malformed stored data, falling back to default");
        Ok(None)
      }
    }
  }

  pub async fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StorageError> {
    Ok(self.load(key).await?.unwrap_or_default())
  }

  pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
    let json = encode(key, value)?;
    self.set_raw(key, &json).await
  }

  /// Write several keys in one transaction: either all land or none do
  pub async fn save_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
    let mut tx = self.pool.begin().await?;
    let updated_at = Utc::now().to_rfc3339();

    for (key, value) in entries {
      sqlx::query(UPSERT_SQL)
        .bind(*key)
        .bind(value.as_str())
        .bind(updated_at.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(keys = entries.len(), "Saved batch");
    Ok(())
  }
}

pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StorageError> {
  serde_json::to_string(value).map_err(|source| StorageError::Serialization {
    key: key.to_string(),
    source,
  })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{refuse_writes_to, setup_test_store, teardown_test_store};

  #[tokio::test]
  async fn test_missing_key_loads_as_none() {
    let store = setup_test_store().await;

    let loaded: Option<Vec<String>> = store.load(keys::WORKOUTS).await.unwrap();
    assert!(loaded.is_none());

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_save_overwrites_previous_value() {
    let store = setup_test_store().await;

    store.save(keys::SETTINGS, &vec!["a"]).await.unwrap();
    store.save(keys::SETTINGS, &vec!["b", "c"]).await.unwrap();

    let loaded: Vec<String> = store.load_or_default(keys::SETTINGS).await.unwrap();
    assert_eq!(loaded, vec!["b", "c"]);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
      .fetch_one(store.pool())
      .await
      .unwrap();
    assert_eq!(rows, 1);

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_malformed_json_falls_back_to_default() {
    let store = setup_test_store().await;
    store.set_raw(keys::COMPLETIONS, "{not json").await.unwrap();

    let loaded: Vec<String> = store.load_or_default(keys::COMPLETIONS).await.unwrap();
    assert!(loaded.is_empty());

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_save_batch_writes_all_keys() {
    let store = setup_test_store().await;

    store
      .save_batch(&[
        (keys::WORKOUTS, "[1]".to_string()),
        (keys::COMPLETIONS, "[2]".to_string()),
      ])
      .await
      .unwrap();

    assert_eq!(store.get_raw(keys::WORKOUTS).await.unwrap().as_deref(), Some("[1]"));
    assert_eq!(store.get_raw(keys::COMPLETIONS).await.unwrap().as_deref(), Some("[2]"));

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_save_batch_rolls_back_when_one_write_fails() {
    let store = setup_test_store().await;
    store.set_raw(keys::WORKOUTS, "[0]").await.unwrap();
    refuse_writes_to(&store, keys::COMPLETIONS).await;

    let result = store
      .save_batch(&[
        (keys::WORKOUTS, "[1]".to_string()),
        (keys::COMPLETIONS, "[2]".to_string()),
      ])
      .await;

    assert!(matches!(result, Err(StorageError::Database(_))));
    assert_eq!(store.get_raw(keys::WORKOUTS).await.unwrap().as_deref(), Some("[0]"));
    assert!(store.get_raw(keys::COMPLETIONS).await.unwrap().is_none());

    teardown_test_store(store).await;
  }
}
