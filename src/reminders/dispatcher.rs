//! Notification delivery for due reminder jobs.

use crate::reminders::error::{DeliveryFailure, SchedulingError};
use crate::reminders::job::ReminderJob;
use crate::reminders::queue::JobQueue;
use crate::tasks::TaskId;
use crate::traits::Notifier;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Default channel identifier.
pub const DEFAULT_CHANNEL_ID: &str = "taskpad_reminders";

/// Default channel display name.
pub const DEFAULT_CHANNEL_NAME: &str = "Task reminders";

/// The channel reminders are posted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    /// Stable identifier.
    pub id: String,
    /// Name shown to the user.
    pub name: String,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self { id: DEFAULT_CHANNEL_ID.to_string(), name: DEFAULT_CHANNEL_NAME.to_string() }
    }
}

/// A user-visible notification, keyed by the task it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Channel it is posted to.
    pub channel_id: String,
    /// Task it opens; also the key a later notification replaces.
    pub task_id: TaskId,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
}

/// What happened to one delivered job.
///
/// Delivery always counts as success once presentation has been attempted;
/// `presented` records whether the platform actually showed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The delivered job.
    pub job: ReminderJob,
    /// Whether the notifier accepted the notification.
    pub presented: bool,
}

/// Presents reminder jobs through a [`Notifier`].
#[derive(Debug)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    channel: NotificationChannel,
    channel_ready: OnceCell<()>,
}

impl NotificationDispatcher {
    /// Create a dispatcher posting to `channel`.
    pub fn new(notifier: Arc<dyn Notifier>, channel: NotificationChannel) -> Self {
        Self { notifier, channel, channel_ready: OnceCell::new() }
    }

    /// The channel this dispatcher posts to.
    #[must_use]
    pub const fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Create the notification channel once.
    ///
    /// After the first success further calls do nothing. A failed attempt is
    /// not remembered, so the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the notifier rejects the channel.
    pub fn ensure_channel(&self) -> Result<(), DeliveryFailure> {
        self.channel_ready
            .get_or_try_init(|| {
                self.notifier.create_channel(&self.channel)?;
                info!(channel = %self.channel.id, "notification channel ready");
                Ok(())
            })
            .map(|_| ())
    }

    /// Present one job. Failures are logged and swallowed, never retried.
    pub fn deliver(&self, job: &ReminderJob) -> DeliveryReport {
        let notification = Notification {
            channel_id: self.channel.id.clone(),
            task_id: job.task_id,
            title: job.title.clone(),
            body: job.body.clone(),
        };

        let presented = match self.ensure_channel().and_then(|()| self.notifier.present(&notification)) {
            Ok(()) => {
                info!(task_id = job.task_id, job_id = job.job_id, "delivered reminder");
                true
            }
            Err(e) => {
                warn!(task_id = job.task_id, job_id = job.job_id, "reminder not presented: {e}");
                false
            }
        };
        DeliveryReport { job: job.clone(), presented }
    }

    /// Claim and deliver every job due at `now`.
    ///
    /// A job is claimed before it is presented, so each surviving job is
    /// delivered at most once, and a job superseded after being read is
    /// skipped because its claim fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or updated.
    pub fn dispatch_due(
        &self,
        queue: &dyn JobQueue,
        now: i64,
    ) -> Result<Vec<DeliveryReport>, SchedulingError> {
        let mut reports = Vec::new();
        for job in queue.due(now)? {
            if !queue.claim(&job)? {
                continue;
            }
            reports.push(self.deliver(&job));
        }
        Ok(reports)
    }
}

/// Notifier that writes reminders to stdout.
///
/// Keeps the last notification per task so a repeat for the same task
/// replaces, rather than adds to, what is visible.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    visible: Mutex<HashMap<TaskId, Notification>>,
}

impl ConsoleNotifier {
    /// Create a console notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications currently visible, one per task.
    #[must_use]
    pub fn visible(&self) -> Vec<Notification> {
        let visible = self.visible.lock().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<Notification> = visible.values().cloned().collect();
        list.sort_by_key(|n| n.task_id);
        list
    }
}

impl Notifier for ConsoleNotifier {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), DeliveryFailure> {
        info!(channel = %channel.id, name = %channel.name, "console channel created");
        Ok(())
    }

    fn present(&self, notification: &Notification) -> Result<(), DeliveryFailure> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "[{}] #{} {}", notification.channel_id, notification.task_id, notification.title)
            .and_then(|()| writeln!(stdout, "    {}", notification.body))
            .map_err(|e| DeliveryFailure::Platform(e.to_string()))?;

        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(notification.task_id, notification.clone());
        Ok(())
    }
}
