//! Reminder job payloads.

use crate::tasks::{Task, TaskId};
use serde::{Deserialize, Serialize};

/// Prefix of every reminder title.
pub const TITLE_PREFIX: &str = "Reminder: ";

/// Characters of the description kept in the title.
pub const TITLE_MAX_CHARS: usize = 40;

/// Build the notification title for a task description.
///
/// Truncation counts characters, so multi-byte text is never split.
#[must_use]
pub fn reminder_title(description: &str) -> String {
    let excerpt: String = description.chars().take(TITLE_MAX_CHARS).collect();
    format!("{TITLE_PREFIX}{excerpt}")
}

/// A job about to be enqueued. The queue assigns its [`ReminderJob::job_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Task the reminder is for. Also the uniqueness key in the queue.
    pub task_id: TaskId,
    /// Notification title.
    pub title: String,
    /// Notification body: the full description.
    pub body: String,
    /// When to deliver, in epoch milliseconds.
    pub fire_at: i64,
}

impl JobRequest {
    /// Build the payload for a task, firing at `fire_at`.
    #[must_use]
    pub fn for_task(task: &Task, fire_at: i64) -> Self {
        Self {
            task_id: task.id,
            title: reminder_title(&task.description),
            body: task.description.clone(),
            fire_at,
        }
    }
}

/// A job held by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    /// Queue-assigned id. Strictly increases across every enqueue and is
    /// never reused, so a replaced job can be told apart from its successor.
    pub job_id: i64,
    /// Task the reminder is for.
    pub task_id: TaskId,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// When to deliver, in epoch milliseconds.
    pub fire_at: i64,
}
