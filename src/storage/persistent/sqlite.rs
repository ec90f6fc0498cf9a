//! SQLite-backed [`PersistentStore`].
//!
//! One table, `entries(key TEXT PRIMARY KEY, value BLOB, created_at INTEGER)`.
//! The connection sits behind a mutex and every call runs on `spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::{PersistenceError, PersistenceResult, PersistentStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entries (
    key        TEXT PRIMARY KEY NOT NULL,
    value      BLOB NOT NULL,
    created_at INTEGER NOT NULL
)";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, enabling WAL mode.
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| PersistenceError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> PersistenceResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<F, T>(&self, f: F) -> PersistenceResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&*conn).map_err(PersistenceError::from)
        })
        .await
        .map_err(|e| PersistenceError::Backend(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn get_by_key(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })
        .await
    }

    async fn set_by_key(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        let key = key.to_string();
        let value = value.to_vec();
        let created_at = chrono::Utc::now().timestamp_millis();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO entries (key, value, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, created_at = excluded.created_at",
                params![key, value, created_at],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete_by_key(&self, key: &str) -> PersistenceResult<bool> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM entries WHERE key = ?1", params![key])
                .map(|n| n > 0)
        })
        .await
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}
