use rusqlite::{Connection, OptionalExtension};

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::{StorageError, StorageRepository};

pub const DEFAULT_DATABASE_PATH: &str = "remote.db";

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Database location from a `DATABASE_URL` value, optionally `sqlite://`
/// prefixed. Relative paths are resolved against the working directory.
pub fn resolve_database_path(db_url: &str) -> PathBuf {
    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let path = PathBuf::from(db_path);

    if db_path != ":memory:"
        && path.is_relative()
        && let Ok(cwd) = env::current_dir()
    {
        let abs_path = cwd.join(&path);
        tracing::debug!(path = %abs_path.display(), "database path resolved");
        return abs_path;
    }

    path
}

pub fn new_connection_result(db_path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(db_path).map_err(|e| {
        tracing::error!(path = %db_path.display(), error = %e, "failed to open database");
        e
    })?;

    // These may fail while another connection holds a transaction, which is fine.
    let _ = conn.execute_batch("PRAGMA busy_timeout = 5000;");
    let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");
    let _ = conn.execute_batch("PRAGMA synchronous = NORMAL;");

    Ok(conn)
}

fn create_kv_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;
    Ok(())
}

/// Key-value storage backed by a single SQLite table.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = new_connection_result(db_path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        create_kv_table(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock().map_err(|_| {
            StorageError::Unavailable("database connection lock poisoned".to_string())
        })?;
        Ok(f(&conn)?)
    }
}

impl StorageRepository for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = strftime('%s', 'now')",
                rusqlite::params![key, value],
            )
            .map(|_| ())
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
                .map(|_| ())
        })
    }
}
