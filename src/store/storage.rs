//! State store trait and SQLite implementation.
//!
//! Persisted cells keep their values here as JSON text under fixed string
//! keys. The store is a convenience cache, not durable storage: a read
//! failure is a miss and a write failure is swallowed after a log line, so
//! callers never see a persistence error.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage backend for persisted cells.
pub trait StateStore: Send + Sync {
  /// Raw JSON stored under `key`, or `None` on a miss or backend failure.
  fn load(&self, key: &str) -> Option<String>;

  /// Store raw JSON under `key`, replacing any previous value.
  fn save(&self, key: &str, json: &str);
}

/// Store that keeps nothing.
/// Used when no usable state directory exists - all operations are no-ops.
pub struct NoopStore;

impl StateStore for NoopStore {
  fn load(&self, _key: &str) -> Option<String> {
    None // Always miss
  }

  fn save(&self, _key: &str, _json: &str) {
    // Discard
  }
}

/// SQLite-based state store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create state directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  /// Open or create a store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open state database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Store backed by an in-memory database, discarded on drop.
  #[allow(dead_code)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory state database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("basalt").join("state.db"))
  }

  /// Run database migrations for the state table.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STATE_SCHEMA)
      .map_err(|e| eyre!("Failed to run state migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the state table.
const STATE_SCHEMA: &str = r#"
-- Key/value store for persisted cells (values are JSON text)
CREATE TABLE IF NOT EXISTS state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    saved_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl StateStore for SqliteStore {
  fn load(&self, key: &str) -> Option<String> {
    let conn = match self.conn.lock() {
      Ok(conn) => conn,
      Err(poisoned) => poisoned.into_inner(),
    };

    conn
      .query_row(
        "SELECT value FROM state WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .ok()
  }

  fn save(&self, key: &str, json: &str) {
    let conn = match self.conn.lock() {
      Ok(conn) => conn,
      Err(poisoned) => poisoned.into_inner(),
    };

    let result = conn.execute(
      "INSERT OR REPLACE INTO state (key, value, saved_at)
       VALUES (?, ?, datetime('now'))",
      params![key, json],
    );
    if let Err(e) = result {
      debug!(key, error = %e, "failed to persist state entry");
    }
  }
}

/// Open the default store, falling back to a no-op store when the state
/// database cannot be opened. The console stays usable either way.
pub fn default_store() -> Arc<dyn StateStore> {
  match SqliteStore::open() {
    Ok(store) => Arc::new(store),
    Err(e) => {
      warn!(error = %e, "state database unavailable, nothing will be persisted");
      Arc::new(NoopStore)
    }
  }
}

/// Deserialize the value stored under `key`. Any failure, including an
/// unreadable entry left by an older version, reads as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
  let raw = store.load(key)?;
  match serde_json::from_str(&raw) {
    Ok(value) => Some(value),
    Err(e) => {
      debug!(key, error = %e, "discarding unreadable state entry");
      None
    }
  }
}

/// Serialize `value` under `key`, best-effort.
pub fn write_json<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) {
  match serde_json::to_string(value) {
    Ok(json) => store.save(key, &json),
    Err(e) => debug!(key, error = %e, "failed to serialize state entry"),
  }
}
