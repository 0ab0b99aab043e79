//! Durable reminder job queue.

use crate::reminders::error::SchedulingError;
use crate::reminders::job::{JobRequest, ReminderJob};
use crate::tasks::TaskId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, SchedulingError>;

const JOB_COLUMNS: &str = "job_id, task_id, title, body, fire_at";

/// Trait for reminder job queues.
///
/// Jobs are keyed by task id: a queue holds at most one job per task, and
/// enqueueing for a task that already has one replaces it atomically.
#[allow(clippy::missing_errors_doc)]
pub trait JobQueue: Send + Sync + std::fmt::Debug {
    /// Enqueue a job, superseding any pending job for the same task.
    ///
    /// Once this returns, the superseded job can no longer be claimed.
    fn enqueue_replace(&self, request: JobRequest) -> QueueResult<ReminderJob>;

    /// Enqueue a job only if the task has none pending.
    ///
    /// Returns `None`, leaving the queue untouched, when a job for the task
    /// already exists. The check and the insert happen in one statement.
    fn enqueue_if_absent(&self, request: JobRequest) -> QueueResult<Option<ReminderJob>>;

    /// Remove the pending job for a task. Returns `false` if there was none.
    fn cancel(&self, task_id: TaskId) -> QueueResult<bool>;

    /// Remove every pending job. Returns the number removed.
    fn cancel_all(&self) -> QueueResult<usize>;

    /// The pending job for a task, if any.
    fn pending(&self, task_id: TaskId) -> QueueResult<Option<ReminderJob>>;

    /// Every pending job, soonest first.
    fn list(&self) -> QueueResult<Vec<ReminderJob>>;

    /// Pending jobs due at `now`, soonest first.
    fn due(&self, now: i64) -> QueueResult<Vec<ReminderJob>>;

    /// Take a job out of the queue for delivery.
    ///
    /// Succeeds only if this exact job (matched by `job_id`) is still
    /// pending. Returns `false` if it was replaced, cancelled, or already
    /// claimed.
    fn claim(&self, job: &ReminderJob) -> QueueResult<bool>;

    /// Fire time of the soonest pending job.
    fn next_fire_at(&self) -> QueueResult<Option<i64>>;
}

/// SQLite-backed job queue. Survives process restarts.
#[derive(Debug)]
pub struct SqliteJobQueue {
    db_path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteJobQueue {
    /// Open (or create) the queue database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> QueueResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init_schema(&conn)?;
        Ok(Self { db_path: Some(db_path), conn: Mutex::new(conn) })
    }

    /// Create a queue backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> QueueResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { db_path: None, conn: Mutex::new(conn) })
    }

    /// Get the database path, or `None` for an in-memory queue.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(conn: &Connection) -> QueueResult<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS reminder_jobs (
                job_id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                fire_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminder_jobs_fire_at ON reminder_jobs(fire_at);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parse_job(row: &rusqlite::Row) -> rusqlite::Result<ReminderJob> {
        Ok(ReminderJob {
            job_id: row.get(0)?,
            task_id: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            fire_at: row.get(4)?,
        })
    }
}

impl JobQueue for SqliteJobQueue {
    fn enqueue_replace(&self, request: JobRequest) -> QueueResult<ReminderJob> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        // Delete-then-insert draws a fresh job_id, so claims against the old row fail.
        tx.execute("DELETE FROM reminder_jobs WHERE task_id = ?1", params![request.task_id])?;
        tx.execute(
            "INSERT INTO reminder_jobs (task_id, title, body, fire_at) VALUES (?1, ?2, ?3, ?4)",
            params![request.task_id, request.title, request.body, request.fire_at],
        )?;
        let job_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(ReminderJob {
            job_id,
            task_id: request.task_id,
            title: request.title,
            body: request.body,
            fire_at: request.fire_at,
        })
    }

    fn enqueue_if_absent(&self, request: JobRequest) -> QueueResult<Option<ReminderJob>> {
        let conn = self.lock();
        let rows = conn.execute(
            "INSERT INTO reminder_jobs (task_id, title, body, fire_at)
             SELECT ?1, ?2, ?3, ?4
             WHERE NOT EXISTS (SELECT 1 FROM reminder_jobs WHERE task_id = ?1)",
            params![request.task_id, request.title, request.body, request.fire_at],
        )?;
        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(ReminderJob {
            job_id: conn.last_insert_rowid(),
            task_id: request.task_id,
            title: request.title,
            body: request.body,
            fire_at: request.fire_at,
        }))
    }

    fn cancel(&self, task_id: TaskId) -> QueueResult<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM reminder_jobs WHERE task_id = ?1", params![task_id])?;
        Ok(rows > 0)
    }

    fn cancel_all(&self) -> QueueResult<usize> {
        let conn = self.lock();
        Ok(conn.execute("DELETE FROM reminder_jobs", [])?)
    }

    fn pending(&self, task_id: TaskId) -> QueueResult<Option<ReminderJob>> {
        let conn = self.lock();
        let job = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM reminder_jobs WHERE task_id = ?1"),
                params![task_id],
                Self::parse_job,
            )
            .optional()?;
        Ok(job)
    }

    fn list(&self) -> QueueResult<Vec<ReminderJob>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {JOB_COLUMNS} FROM reminder_jobs ORDER BY fire_at, job_id"))?;
        let jobs = stmt.query_map([], Self::parse_job)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn due(&self, now: i64) -> QueueResult<Vec<ReminderJob>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM reminder_jobs WHERE fire_at <= ?1 ORDER BY fire_at, job_id"
        ))?;
        let jobs =
            stmt.query_map(params![now], Self::parse_job)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn claim(&self, job: &ReminderJob) -> QueueResult<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM reminder_jobs WHERE job_id = ?1", params![job.job_id])?;
        Ok(rows > 0)
    }

    fn next_fire_at(&self) -> QueueResult<Option<i64>> {
        let conn = self.lock();
        let next: Option<i64> =
            conn.query_row("SELECT MIN(fire_at) FROM reminder_jobs", [], |row| row.get(0))?;
        Ok(next)
    }
}
