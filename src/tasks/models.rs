//! Task model types.

use serde::{Deserialize, Serialize};

/// Store-assigned task identifier. Assigned once on create and never reused.
pub type TaskId = i64;

/// Task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// High priority.
    High,
    /// Medium priority (default).
    #[default]
    Medium,
    /// Low priority.
    Low,
}

impl Priority {
    /// Parse a priority from a string, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not one of `high`, `medium`, `low`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidPriority> {
        match s.trim().to_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }

    /// Get the stored string representation of the priority.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid priority string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPriority(pub String);

impl std::fmt::Display for InvalidPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid priority: '{}' (must be one of: high, medium, low)", self.0)
    }
}

impl std::error::Error for InvalidPriority {}

/// A task as persisted by the task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier assigned by the store.
    pub id: TaskId,
    /// What needs doing. Never empty once stored.
    pub description: String,
    /// Whether the task has been done.
    pub is_completed: bool,
    /// Creation time in epoch milliseconds. Set by the store, never changed.
    pub created_at: i64,
    /// Priority level.
    pub priority: Priority,
    /// Optional category; `None` means uncategorized.
    pub category: Option<String>,
    /// Whether the reminder repeats.
    pub is_recurring: bool,
    /// Minutes between repeats. Only meaningful when `is_recurring` is set.
    pub recurrence_minutes: u32,
    /// Next reminder time in epoch milliseconds, `0` when none is scheduled.
    pub next_run_at: i64,
}

impl Task {
    /// Whether this task qualifies for a scheduled notification.
    #[must_use]
    pub const fn is_reminder_eligible(&self) -> bool {
        self.is_recurring || self.next_run_at > 0
    }

    /// Case-insensitive substring match against description or category.
    ///
    /// A task without a category can only match on its description.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.description.to_lowercase().contains(&needle)
            || self.category.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
    }
}

/// Caller-supplied fields for a task that has not been stored yet.
///
/// Everything except `id` and `created_at`, which the store assigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// What needs doing.
    pub description: String,
    /// Initial completion state.
    #[serde(default)]
    pub is_completed: bool,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Optional category.
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the reminder repeats.
    #[serde(default)]
    pub is_recurring: bool,
    /// Minutes between repeats.
    #[serde(default)]
    pub recurrence_minutes: u32,
    /// Next reminder time in epoch milliseconds, `0` for none.
    #[serde(default)]
    pub next_run_at: i64,
}

impl NewTask {
    /// Start a new pending task with default priority and no reminder.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), ..Self::default() }
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Make the reminder repeat every `minutes`.
    #[must_use]
    pub const fn recurring_every(mut self, minutes: u32) -> Self {
        self.is_recurring = true;
        self.recurrence_minutes = minutes;
        self
    }

    /// Schedule the first reminder at an absolute epoch-millisecond time.
    #[must_use]
    pub const fn remind_at(mut self, epoch_millis: i64) -> Self {
        self.next_run_at = epoch_millis;
        self
    }

    /// Mark the task as already done.
    #[must_use]
    pub const fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    /// Build the stored task once the store has assigned its id and timestamp.
    #[must_use]
    pub fn into_task(self, id: TaskId, created_at: i64) -> Task {
        Task {
            id,
            description: self.description,
            is_completed: self.is_completed,
            created_at,
            priority: self.priority,
            category: normalize_category(self.category),
            is_recurring: self.is_recurring,
            recurrence_minutes: self.recurrence_minutes,
            next_run_at: self.next_run_at,
        }
    }
}

/// Blank categories are stored as uncategorized.
pub(crate) fn normalize_category(category: Option<String>) -> Option<String> {
    category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}
