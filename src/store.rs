// src/store.rs
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const FAVORITE_EXERCISES_KEY: &str = "favoriteExercises";
pub const EQUIPMENT_PREFERENCES_KEY: &str = "equipmentPreferencesData";

const STORE_FILE_NAME: &str = "store.sqlite";
const APP_DATA_DIR: &str = "fitness-planner";

/// Key holding the active block index of a routine.
pub fn active_block_key(routine_id: &str) -> String {
    format!("activeBlock_{routine_id}")
}

/// Key holding the completed days of one week of a block.
pub fn completed_days_key(block_name: &str, week: u32) -> String {
    format!("completed_{block_name}_week{week}")
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing store file")]
    Io(#[from] std::io::Error),
    #[error("Store query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Store update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Store delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
    #[error("Value under key '{key}' is not valid JSON: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("Failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Flat string-keyed persistence. Values are JSON text written by the callers.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Reads and decodes the JSON value stored under `key`.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, Error> {
    match store.get(key)? {
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| Error::Decode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`, replacing any previous value.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), Error> {
    let text = serde_json::to_string(value).map_err(|source| Error::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &text)
}

/// Gets the path to the SQLite store file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_store_path() -> Result<PathBuf, Error> {
    let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(STORE_FILE_NAME))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and initializes) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(Error::Connection)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(Error::Connection)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), Error> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL -- RFC3339
                )",
                [],
            )
            .map_err(Error::Connection)?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        debug!(key, "store get");
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::QueryFailed)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        debug!(key, bytes = value.len(), "store set");
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(Error::UpdateFailed)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        debug!(key, "store remove");
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(Error::DeleteFailed)?;
        Ok(())
    }
}

/// Non-persistent store, handy for previews and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Serves reads from an in-memory map and fails every write.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ReadOnlyStore {
    pub(crate) inner: MemoryStore,
}

#[cfg(test)]
impl ReadOnlyStore {
    fn refuse() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "store is read-only",
        ))
    }
}

#[cfg(test)]
impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), Error> {
        Err(Self::refuse())
    }

    fn remove(&self, _key: &str) -> Result<(), Error> {
        Err(Self::refuse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_store_refuses_writes() {
        let store = ReadOnlyStore::default();
        store.inner.set("k", "1").unwrap();
        assert!(matches!(store.set("k", "2"), Err(Error::Io(_))));
        assert!(store.remove("k").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn sqlite_store_round_trip_and_overwrite() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("k", "[1]").unwrap();
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing a missing key is not an error
        store.remove("k").unwrap();
    }

    #[test]
    fn get_json_reports_undecodable_values() {
        let store = MemoryStore::new();
        store.set("broken", "{not json").unwrap();
        let result = get_json::<Vec<String>>(&store, "broken");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn key_formats() {
        assert_eq!(active_block_key("ppl"), "activeBlock_ppl");
        assert_eq!(completed_days_key("Hypertrophy", 3), "completed_Hypertrophy_week3");
    }
}
