//! # `taskpad`
//!
//! A local task list with filtered views and deferred reminder notifications.
//!
//! - [`tasks`]: durable task storage with a snapshot stream
//! - [`view`]: filter, search, and sort over a snapshot
//! - [`reminders`]: replace-on-reschedule job queue and notification delivery
//! - [`board`]: the above wired together

pub mod board;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod reminders;
pub mod tasks;
pub mod testing;
pub mod traits;
pub mod view;

pub use board::{ReminderStatus, Saved, TaskBoard};
pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
