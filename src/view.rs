//! Derivation of the displayed task list.
//!
//! [`compose`] is a pure function from the raw collection plus the current
//! search text, filter and sort to the ordered list the UI renders.
//! [`TaskView`] wraps it with a cache so redraws that change nothing do not
//! recompute.

use crate::tasks::{Snapshot, Task};
use serde::{Deserialize, Serialize};

/// Which tasks to show by completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterMode {
    /// Every task.
    #[default]
    All,
    /// Only tasks not yet completed.
    Pending,
    /// Only completed tasks.
    Completed,
}

impl FilterMode {
    /// Parse a filter mode, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `all`, `pending`, or `completed`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidFilterMode> {
        match s.trim().to_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(InvalidFilterMode(s.to_string())),
        }
    }

    /// Get the string representation of the filter mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether a task passes this filter.
    #[must_use]
    pub const fn accepts(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.is_completed,
            Self::Completed => task.is_completed,
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid filter mode string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFilterMode(pub String);

impl std::fmt::Display for InvalidFilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid filter: '{}' (must be one of: all, pending, completed)", self.0)
    }
}

impl std::error::Error for InvalidFilterMode {}

/// Ordering of the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortMode {
    /// Ascending by description, ignoring case.
    ByName,
    /// Newest first.
    #[default]
    ByDate,
    /// Pending before completed, oldest first within each group.
    ByState,
}

impl SortMode {
    /// Parse a sort mode, ignoring case. The `by_` prefix is optional and
    /// `-` is accepted in place of `_`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string names no sort mode.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidSortMode> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        match normalized.strip_prefix("BY_").unwrap_or(&normalized) {
            "NAME" => Ok(Self::ByName),
            "DATE" => Ok(Self::ByDate),
            "STATE" => Ok(Self::ByState),
            _ => Err(InvalidSortMode(s.to_string())),
        }
    }

    /// Get the string representation of the sort mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ByName => "BY_NAME",
            Self::ByDate => "BY_DATE",
            Self::ByState => "BY_STATE",
        }
    }

    fn sort(self, tasks: &mut [Task]) {
        match self {
            Self::ByName => tasks.sort_by_cached_key(|t| t.description.to_lowercase()),
            Self::ByDate => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::ByState => tasks.sort_by_key(|t| (t.is_completed, t.created_at)),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid sort mode string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSortMode(pub String);

impl std::fmt::Display for InvalidSortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid sort: '{}' (must be one of: by_name, by_date, by_state)", self.0)
    }
}

impl std::error::Error for InvalidSortMode {}

/// The user-controlled inputs to [`compose`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    /// Free-text search. Blank means no search.
    pub search: String,
    /// Completion filter.
    pub filter: FilterMode,
    /// Ordering.
    pub sort: SortMode,
}

impl ViewQuery {
    /// Build a query from its three parts.
    #[must_use]
    pub fn new(search: impl Into<String>, filter: FilterMode, sort: SortMode) -> Self {
        Self { search: search.into(), filter, sort }
    }
}

/// Compute the list to display: filter, then search, then sort.
///
/// Sorting is stable, so tasks that compare equal keep their input order.
#[must_use]
pub fn compose(tasks: &[Task], query: &ViewQuery) -> Vec<Task> {
    // Blankness is judged on the trimmed text; the needle is the text as typed.
    let searching = !query.search.trim().is_empty();

    let mut result: Vec<Task> = tasks
        .iter()
        .filter(|t| query.filter.accepts(t))
        .filter(|t| !searching || t.matches_query(&query.search))
        .cloned()
        .collect();

    query.sort.sort(&mut result);
    result
}

/// A cached, reactive view over the task collection.
///
/// Feed it snapshots from a [`Subscription`](crate::tasks::Subscription) and
/// query changes from the UI; [`tasks`](Self::tasks) recomputes only when one
/// of those inputs actually changed since the last call.
#[derive(Debug, Default)]
pub struct TaskView {
    query: ViewQuery,
    snapshot: Option<Snapshot>,
    cached: Option<Vec<Task>>,
    recomputations: usize,
}

impl TaskView {
    /// Create a view with the given initial query and no data yet.
    #[must_use]
    pub const fn new(query: ViewQuery) -> Self {
        Self { query, snapshot: None, cached: None, recomputations: 0 }
    }

    /// The current query.
    #[must_use]
    pub const fn query(&self) -> &ViewQuery {
        &self.query
    }

    /// Update the search text.
    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.query.search {
            self.query.search = search;
            self.cached = None;
        }
    }

    /// Update the filter mode.
    pub fn set_filter(&mut self, filter: FilterMode) {
        if filter != self.query.filter {
            self.query.filter = filter;
            self.cached = None;
        }
    }

    /// Update the sort mode.
    pub fn set_sort(&mut self, sort: SortMode) {
        if sort != self.query.sort {
            self.query.sort = sort;
            self.cached = None;
        }
    }

    /// Accept a snapshot from the store.
    ///
    /// A snapshot with the same version as the current one is ignored.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if self.snapshot.as_ref().is_some_and(|s| s.version == snapshot.version) {
            return;
        }
        self.snapshot = Some(snapshot);
        self.cached = None;
    }

    /// The composed list. Empty until the first snapshot arrives.
    pub fn tasks(&mut self) -> &[Task] {
        let Some(snapshot) = &self.snapshot else {
            return &[];
        };
        if self.cached.is_none() {
            self.recomputations += 1;
            self.cached = Some(compose(&snapshot.tasks, &self.query));
        }
        self.cached.as_deref().unwrap_or_default()
    }

    /// How many times the list has been recomputed.
    #[must_use]
    pub const fn recomputations(&self) -> usize {
        self.recomputations
    }
}
