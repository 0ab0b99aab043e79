//! Task store trait and `SQLite` implementation.

use crate::error::{Result, TaskNotFound, ValidationError};
use crate::tasks::models::{normalize_category, NewTask, Priority, Task, TaskId};
use crate::tasks::subscription::{Snapshot, SnapshotPublisher, Subscription};
use crate::traits::{Clock, SystemClock};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Columns in the order [`SqliteTaskStore::parse_task`] reads them.
const TASK_COLUMNS: &str = "id, description, is_completed, created_at, priority, category, \
                            is_recurring, recurrence_minutes, next_run_at";

/// Trait for task storage operations.
///
/// Mutations are durable before they return, and subscribers are notified
/// only after the write has been committed.
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore: Send + Sync {
    /// Insert a new task and return its assigned id.
    fn create(&self, task: NewTask) -> Result<TaskId>;

    /// Get a task by ID.
    fn get(&self, id: TaskId) -> Result<Option<Task>>;

    /// Replace the stored record with the same id.
    ///
    /// `created_at` is kept from the stored record.
    fn update(&self, task: &Task) -> Result<()>;

    /// Move a task's reminder time from `expected` to `next_run_at`.
    ///
    /// Applies only if the stored `next_run_at` still equals `expected`;
    /// every other field is left as stored. Returns whether it applied.
    fn advance_next_run(&self, id: TaskId, expected: i64, next_run_at: i64) -> Result<bool>;

    /// Delete a task by ID. Returns `false` if there was nothing to delete.
    fn delete(&self, id: TaskId) -> Result<bool>;

    /// Delete every task. Returns the number removed.
    fn delete_all(&self) -> Result<usize>;

    /// Every stored task. Callers must not rely on the order.
    fn get_all(&self) -> Result<Vec<Task>>;

    /// Stream of full-collection snapshots, starting with the current one.
    fn subscribe(&self) -> Subscription;
}

/// SQLite-based task store.
///
/// A single connection behind a mutex is the one point of serialization for
/// writes. The snapshot for a write is published before the guard is
/// released, so snapshot versions follow commit order.
#[derive(Debug)]
pub struct SqliteTaskStore {
    db_path: Option<PathBuf>,
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    publisher: SnapshotPublisher,
}

impl SqliteTaskStore {
    /// Create a new `SQLite` task store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// Create a store that stamps `created_at` from the given clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn with_clock(db_path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(Some(db_path), conn, clock)
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::from_connection(None, Connection::open_in_memory()?, clock)
    }

    fn from_connection(
        db_path: Option<PathBuf>,
        conn: Connection,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::init_schema(&conn)?;
        let existing = Self::read_all(&conn)?;
        Ok(Self { db_path, conn: Mutex::new(conn), clock, publisher: SnapshotPublisher::new(existing) })
    }

    /// Get the database path, or `None` for an in-memory store.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// The snapshot most recently published to subscribers.
    #[must_use]
    pub fn current_snapshot(&self) -> Snapshot {
        self.publisher.current()
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        // AUTOINCREMENT keeps ids from being reused after deletes.
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL CHECK (length(trim(description)) > 0),
                is_completed INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                priority TEXT NOT NULL DEFAULT 'MEDIUM'
                    CHECK (priority IN ('HIGH', 'MEDIUM', 'LOW')),
                category TEXT,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                recurrence_minutes INTEGER NOT NULL DEFAULT 0,
                next_run_at INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse a task from a row selected with [`TASK_COLUMNS`].
    fn parse_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let priority: String = row.get(4)?;
        Ok(Task {
            id: row.get(0)?,
            description: row.get(1)?,
            is_completed: row.get(2)?,
            created_at: row.get(3)?,
            priority: Priority::from_str(&priority).unwrap_or_default(),
            category: row.get(5)?,
            is_recurring: row.get(6)?,
            recurrence_minutes: row.get(7)?,
            next_run_at: row.get(8)?,
        })
    }

    fn read_all(conn: &Connection) -> Result<Vec<Task>> {
        let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
        let tasks = stmt.query_map([], Self::parse_task)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn read_one(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Publish the post-write collection. Must be called with the write guard held.
    fn publish(&self, conn: &Connection) {
        match Self::read_all(conn) {
            Ok(tasks) => {
                let version = self.publisher.publish(tasks);
                debug!(version, "published task snapshot");
            }
            // The write is already committed; subscribers catch up on the next one.
            Err(e) => error!("failed to read tasks for snapshot: {e}"),
        }
    }

    fn validate_description(description: &str) -> Result<()> {
        if description.trim().is_empty() {
            return Err(ValidationError::empty_description().into());
        }
        Ok(())
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: NewTask) -> Result<TaskId> {
        Self::validate_description(&task.description)?;
        let created_at = self.clock.now_millis();

        let conn = self.lock();
        conn.execute(
            "INSERT INTO tasks (description, is_completed, created_at, priority, category,
                                is_recurring, recurrence_minutes, next_run_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                task.description,
                task.is_completed,
                created_at,
                task.priority.as_str(),
                normalize_category(task.category),
                task.is_recurring,
                task.recurrence_minutes,
                task.next_run_at,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(task_id = id, "created task");

        self.publish(&conn);
        Ok(id)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>> {
        let conn = self.lock();
        Self::read_one(&conn, id)
    }

    fn update(&self, task: &Task) -> Result<()> {
        Self::validate_description(&task.description)?;

        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE tasks SET description = ?1, is_completed = ?2, priority = ?3, category = ?4,
                              is_recurring = ?5, recurrence_minutes = ?6, next_run_at = ?7
             WHERE id = ?8",
            params![
                task.description,
                task.is_completed,
                task.priority.as_str(),
                normalize_category(task.category.clone()),
                task.is_recurring,
                task.recurrence_minutes,
                task.next_run_at,
                task.id,
            ],
        )?;
        if rows == 0 {
            return Err(TaskNotFound(task.id).into());
        }
        debug!(task_id = task.id, "updated task");

        self.publish(&conn);
        Ok(())
    }

    fn advance_next_run(&self, id: TaskId, expected: i64, next_run_at: i64) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE tasks SET next_run_at = ?1 WHERE id = ?2 AND next_run_at = ?3",
            params![next_run_at, id, expected],
        )?;
        if rows == 0 {
            debug!(task_id = id, expected, "reminder time changed, not advancing");
            return Ok(false);
        }
        debug!(task_id = id, next_run_at, "advanced reminder time");

        self.publish(&conn);
        Ok(true)
    }

    fn delete(&self, id: TaskId) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if rows > 0 {
            debug!(task_id = id, "deleted task");
        }

        self.publish(&conn);
        Ok(rows > 0)
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM tasks", [])?;
        debug!(count = rows, "deleted all tasks");

        self.publish(&conn);
        Ok(rows)
    }

    fn get_all(&self) -> Result<Vec<Task>> {
        let conn = self.lock();
        Self::read_all(&conn)
    }

    fn subscribe(&self) -> Subscription {
        self.publisher.subscribe()
    }
}
