//! Core traits for testability and abstraction.

use crate::reminders::{DeliveryFailure, Notification, NotificationChannel};
use std::fmt::Debug;

/// Source of the current time in epoch milliseconds.
///
/// Task timestamps and reminder delays both read from a clock so tests can
/// pin time instead of sleeping.
pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Platform notification layer.
///
/// Implementations present one visible notification per task id: presenting
/// again for the same task replaces the earlier notification instead of
/// stacking a second one.
pub trait Notifier: Send + Sync + Debug {
    /// Register the channel notifications are posted to.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the channel.
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), DeliveryFailure>;

    /// Show a notification to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if presentation fails, for example when permission
    /// to post notifications has not been granted.
    fn present(&self, notification: &Notification) -> Result<(), DeliveryFailure>;
}
