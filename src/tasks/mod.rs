//! Task storage.
//!
//! This module provides the durable task collection:
//! - Tasks with description, completion state, priority, and optional category
//! - Optional reminder settings (one-off time and/or repeat interval)
//! - A snapshot stream that publishes the whole collection after every write
//!
//! # Example
//!
//! ```no_run
//! use taskpad::tasks::{NewTask, Priority, SqliteTaskStore, TaskStore};
//!
//! let store = SqliteTaskStore::new("/tmp/tasks.sqlite3").unwrap();
//! let mut updates = store.subscribe();
//!
//! let id = store
//!     .create(NewTask::new("Buy milk").with_category("Errands").with_priority(Priority::High))
//!     .unwrap();
//!
//! let snapshot = updates.try_next().unwrap();
//! assert!(snapshot.tasks.iter().any(|t| t.id == id));
//! ```

pub mod models;
pub mod store;
pub mod subscription;

pub use models::{InvalidPriority, NewTask, Priority, Task, TaskId};
pub use store::{SqliteTaskStore, TaskStore};
pub use subscription::{Snapshot, Subscription};
