//! Key/value slot repository contracts and implementations.
//!
//! # Responsibility
//! - Read, write and remove whole string values by key.
//! - Provide a SQLite implementation and an in-memory one.
//!
//! # Invariants
//! - `write_slot` replaces any previous value for the key atomically.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for slot persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
            Self::InvalidData(message) => write!(f, "invalid slot data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-value key/value storage.
pub trait SlotRepository {
    /// Returns the stored value, or `None` when the key was never written.
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn write_slot(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Deletes the key. Returns `true` when it existed.
    fn remove_slot(&self, key: &str) -> RepoResult<bool>;
}

/// SQLite-backed slot repository. Owns its connection.
pub struct SqliteSlotRepository {
    conn: Connection,
}

impl SqliteSlotRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the `slots` table is absent.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        if !table_exists(&conn, "slots")? {
            return Err(RepoError::MissingRequiredTable("slots"));
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SlotRepository for SqliteSlotRepository {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1;", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write_slot(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM slots WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }
}

/// In-memory slot repository. Clones share the same map, so a test can keep
/// a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotRepository {
    slots: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySlotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository pre-populated with one raw value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let repo = Self::new();
        repo.lock().insert(key.to_string(), value.to_string());
        repo
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SlotRepository for MemorySlotRepository {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: &str) -> RepoResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        Ok(self.lock().remove(key).is_some())
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::{MemorySlotRepository, RepoError, SlotRepository, SqliteSlotRepository};
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;

    #[test]
    fn sqlite_slot_write_replaces_previous_value() {
        let repo = SqliteSlotRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        assert_eq!(repo.read_slot("k").unwrap(), None);

        repo.write_slot("k", "first").unwrap();
        repo.write_slot("k", "second").unwrap();
        assert_eq!(repo.read_slot("k").unwrap().as_deref(), Some("second"));

        let rows: i64 = repo
            .connection()
            .query_row("SELECT COUNT(*) FROM slots;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn sqlite_slot_remove_reports_existence() {
        let repo = SqliteSlotRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        repo.write_slot("k", "v").unwrap();
        assert!(repo.remove_slot("k").unwrap());
        assert!(!repo.remove_slot("k").unwrap());
    }

    #[test]
    fn sqlite_slot_requires_migrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteSlotRepository::try_new(conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable("slots")));
    }

    #[test]
    fn memory_slot_clones_share_state() {
        let repo = MemorySlotRepository::new();
        let observer = repo.clone();
        repo.write_slot("a", "1").unwrap();
        assert_eq!(observer.read_slot("a").unwrap().as_deref(), Some("1"));
        assert_eq!(observer.keys(), vec!["a".to_string()]);
    }
}
