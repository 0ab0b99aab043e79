//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

#![allow(dead_code)]

use crate::reminders::{
    DeliveryFailure, JobQueue, JobRequest, Notification, NotificationChannel, QueueResult,
    ReminderJob, SchedulingError,
};
use crate::tasks::TaskId;
use crate::traits::{Clock, Notifier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `epoch_millis`.
    #[must_use]
    pub const fn new(epoch_millis: i64) -> Self {
        Self { now: AtomicI64::new(epoch_millis) }
    }

    /// Move the clock forward.
    pub fn advance_millis(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, epoch_millis: i64) {
        self.now.store(epoch_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    channels_created: usize,
    presented: Vec<Notification>,
    visible: HashMap<TaskId, Notification>,
    fail_present: Option<DeliveryFailure>,
    fail_channel: Option<DeliveryFailure>,
}

/// A notifier that records everything it is asked to show.
///
/// Can be told to fail, to exercise the swallow-and-log path.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    state: Mutex<NotifierState>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `present` fail with the given error, or succeed again with `None`.
    pub fn fail_with(&self, failure: Option<DeliveryFailure>) {
        self.state().fail_present = failure;
    }

    /// Make `create_channel` fail with the given error, or succeed with `None`.
    pub fn fail_channel_with(&self, failure: Option<DeliveryFailure>) {
        self.state().fail_channel = failure;
    }

    /// How many times a channel was successfully created.
    #[must_use]
    pub fn channels_created(&self) -> usize {
        self.state().channels_created
    }

    /// Every notification successfully presented, in order.
    #[must_use]
    pub fn presented(&self) -> Vec<Notification> {
        self.state().presented.clone()
    }

    /// What the user would currently see: the latest notification per task.
    #[must_use]
    pub fn visible(&self) -> Vec<Notification> {
        let mut visible: Vec<Notification> = self.state().visible.values().cloned().collect();
        visible.sort_by_key(|n| n.task_id);
        visible
    }
}

impl Notifier for RecordingNotifier {
    fn create_channel(&self, _channel: &NotificationChannel) -> Result<(), DeliveryFailure> {
        let mut state = self.state();
        if let Some(failure) = state.fail_channel.clone() {
            return Err(failure);
        }
        state.channels_created += 1;
        Ok(())
    }

    fn present(&self, notification: &Notification) -> Result<(), DeliveryFailure> {
        let mut state = self.state();
        if let Some(failure) = state.fail_present.clone() {
            return Err(failure);
        }
        state.presented.push(notification.clone());
        state.visible.insert(notification.task_id, notification.clone());
        Ok(())
    }
}

/// A job queue whose every operation fails.
#[derive(Debug, Default)]
pub struct UnavailableJobQueue;

impl UnavailableJobQueue {
    fn error() -> SchedulingError {
        SchedulingError::Unavailable("job queue offline".to_string())
    }
}

impl JobQueue for UnavailableJobQueue {
    fn enqueue_replace(&self, _request: JobRequest) -> QueueResult<ReminderJob> {
        Err(Self::error())
    }

    fn enqueue_if_absent(&self, _request: JobRequest) -> QueueResult<Option<ReminderJob>> {
        Err(Self::error())
    }

    fn cancel(&self, _task_id: TaskId) -> QueueResult<bool> {
        Err(Self::error())
    }

    fn cancel_all(&self) -> QueueResult<usize> {
        Err(Self::error())
    }

    fn pending(&self, _task_id: TaskId) -> QueueResult<Option<ReminderJob>> {
        Err(Self::error())
    }

    fn list(&self) -> QueueResult<Vec<ReminderJob>> {
        Err(Self::error())
    }

    fn due(&self, _now: i64) -> QueueResult<Vec<ReminderJob>> {
        Err(Self::error())
    }

    fn claim(&self, _job: &ReminderJob) -> QueueResult<bool> {
        Err(Self::error())
    }

    fn next_fire_at(&self) -> QueueResult<Option<i64>> {
        Err(Self::error())
    }
}
