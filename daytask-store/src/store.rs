//! SQLite-backed task store.
//!
//! Every operation opens its own connection to the database file, so a
//! [`TaskStore`] can be cloned freely and shared across threads. Concurrent
//! readers and writers are serialized by SQLite (WAL journal plus a busy
//! timeout); the store adds no locking of its own.
//!
//! Toggle, edit, and remove match rows by `(description, day)`. Nothing
//! keeps that pair unique, so each of these touches every matching row, and
//! touching zero rows is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, params};

use crate::progress::Progress;
use crate::task::Task;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT,
    done BOOLEAN,
    day TEXT
)";

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A query or statement failed (I/O, malformed SQL, constraint, ...).
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The directory that should hold the database file could not be created.
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Persistent store of [`Task`] rows in a single SQLite file.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Opens the database at `path`, creating the file, its parent directory,
    /// and the `tasks` table as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be created or the
    /// schema cannot be applied.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let store = Self { path };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %store.path.display(), "task store ready");
        Ok(store)
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(conn)
    }

    /// Returns every task in the `day` bucket in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn list_by_day(&self, day: &str) -> Result<Vec<Task>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, description, done, day FROM tasks WHERE day = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![day], |row| {
            Ok(Task {
                id: row.get(0)?,
                description: row.get(1)?,
                done: row.get(2)?,
                day: row.get(3)?,
            })
        })?;
        let tasks = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Inserts a not-yet-done task and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the insert fails.
    pub fn add(&self, description: &str, day: &str) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO tasks (description, done, day) VALUES (?1, ?2, ?3)",
            params![description, false, day],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, day, "task added");
        Ok(id)
    }

    /// Flips `done` on every task matching `description` in `day`.
    ///
    /// Returns the number of rows touched, which may be zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the update fails.
    pub fn toggle_by_description_and_day(
        &self,
        description: &str,
        day: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let affected = conn.execute(
            "UPDATE tasks SET done = NOT done WHERE description = ?1 AND day = ?2",
            params![description, day],
        )?;
        Ok(affected)
    }

    /// Renames every task called `old_description` in `day` to
    /// `new_description`. Tasks in other days are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the update fails.
    pub fn edit_by_description_and_day(
        &self,
        old_description: &str,
        new_description: &str,
        day: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let affected = conn.execute(
            "UPDATE tasks SET description = ?1 WHERE description = ?2 AND day = ?3",
            params![new_description, old_description, day],
        )?;
        Ok(affected)
    }

    /// Permanently deletes every task matching `description` in `day`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the delete fails.
    pub fn remove_by_description_and_day(
        &self,
        description: &str,
        day: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let affected = conn.execute(
            "DELETE FROM tasks WHERE description = ?1 AND day = ?2",
            params![description, day],
        )?;
        Ok(affected)
    }

    /// Counts the completed tasks in `day`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn count_done_by_day(&self, day: &str) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE done = ?1 AND day = ?2",
            params![true, day],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Done and total counts for `day`, as shown by the console progress bar.
    ///
    /// Both counts come from one statement, so they describe the same
    /// snapshot of the table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn progress_for_day(&self, day: &str) -> Result<Progress, StoreError> {
        let conn = self.connect()?;
        let (done, total) = conn.query_row(
            "SELECT COUNT(CASE WHEN done = ?1 THEN 1 END), COUNT(*) FROM tasks WHERE day = ?2",
            params![true, day],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Progress::new(done, total))
    }
}
