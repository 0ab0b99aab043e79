//! Path utilities for determining data storage locations.
//!
//! Everything taskpad persists lives in one data directory: `$TASKPAD_HOME`
//! when set, otherwise `~/.taskpad/`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TASKPAD_HOME";

/// The base directory name under the home directory.
const DATA_DIR_NAME: &str = ".taskpad";

/// The task database filename.
pub const TASKS_DB_FILENAME: &str = "tasks.sqlite3";

/// The reminder job queue filename.
pub const JOBS_DB_FILENAME: &str = "reminders.sqlite3";

/// The configuration filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Get the data directory.
///
/// Returns `$TASKPAD_HOME` if set and non-empty, otherwise `~/.taskpad/`,
/// or `None` if the home directory cannot be determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir().map(|home| home.join(DATA_DIR_NAME)),
    }
}

/// Pick the data directory: `explicit` if given, else [`data_dir`].
///
/// # Errors
///
/// Returns a configuration error if neither is available.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit.or_else(data_dir).ok_or_else(|| {
        Error::Config(format!(
            "could not determine data directory; set {DATA_DIR_ENV} or pass --data-dir"
        ))
    })
}

/// Path of the task database inside `data_dir`.
#[must_use]
pub fn tasks_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(TASKS_DB_FILENAME)
}

/// Path of the reminder job queue inside `data_dir`.
#[must_use]
pub fn jobs_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(JOBS_DB_FILENAME)
}

/// Path of the configuration file inside `data_dir`.
#[must_use]
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILENAME)
}
