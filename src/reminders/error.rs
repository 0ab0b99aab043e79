//! Reminder error types.

/// A reminder job could not be enqueued, cancelled, or read.
///
/// Scheduling is best-effort: the task mutation that triggered it has
/// already been committed when one of these is reported.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// The job queue database failed.
    #[error("job queue error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The job queue directory could not be created.
    #[error("job queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The scheduler cannot accept work right now.
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),
}

/// A notification could not be presented.
///
/// Logged and dropped by the dispatcher; never retried and never written
/// back to task data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The user has not allowed notifications.
    #[error("notification permission denied")]
    PermissionDenied,

    /// The notification channel does not exist or was rejected.
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Any other platform failure.
    #[error("notification failed: {0}")]
    Platform(String),
}
