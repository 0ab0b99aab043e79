//! Error types for `taskpad`.

use crate::reminders::SchedulingError;
use crate::tasks::TaskId;

/// Errors that can occur while managing tasks and reminders.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The caller supplied a task that cannot be stored.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An update or lookup referenced a task that does not exist.
    #[error(transparent)]
    NotFound(#[from] TaskNotFound),

    /// A reminder job could not be enqueued or cancelled.
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// The data directory or configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error when a task is rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    /// The description was empty or whitespace only.
    #[must_use]
    pub fn empty_description() -> Self {
        Self("task description must not be empty".to_string())
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid task: {}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Error when a referenced task is not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskNotFound(pub TaskId);

impl std::fmt::Display for TaskNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task not found: {}", self.0)
    }
}

impl std::error::Error for TaskNotFound {}
