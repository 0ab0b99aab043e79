//! Deferred task reminders.
//!
//! Scheduling turns a task's reminder settings into a single pending job
//! per task in a durable queue. Rescheduling replaces the job; a replaced
//! job can never be delivered. Delivery claims due jobs and presents them
//! through a [`Notifier`](crate::traits::Notifier) on one channel.

mod error;
pub mod dispatcher;
pub mod job;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use dispatcher::{
    ConsoleNotifier, DeliveryReport, Notification, NotificationChannel, NotificationDispatcher,
};
pub use error::{DeliveryFailure, SchedulingError};
pub use job::{reminder_title, JobRequest, ReminderJob};
pub use queue::{JobQueue, QueueResult, SqliteJobQueue};
pub use scheduler::{next_occurrence, reminder_delay, ReminderScheduler, ScheduleOutcome};
pub use worker::ReminderWorker;
