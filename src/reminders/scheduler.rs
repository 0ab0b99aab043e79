//! Reminder scheduling policy.

use crate::reminders::error::SchedulingError;
use crate::reminders::job::{JobRequest, ReminderJob};
use crate::reminders::queue::JobQueue;
use crate::tasks::{Task, TaskId};
use crate::traits::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// What [`ReminderScheduler::schedule_if_needed`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A job was enqueued, replacing any earlier one for the task.
    Scheduled(ReminderJob),
    /// The task is not reminder-eligible; the queue was not touched.
    NotEligible,
}

/// Milliseconds before a reminder for `task` should fire, as seen at `now`.
///
/// Zero when the task has no reminder time or the time has already passed.
#[must_use]
pub fn reminder_delay(task: &Task, now: i64) -> i64 {
    if task.next_run_at <= 0 {
        return 0;
    }
    task.next_run_at.saturating_sub(now).max(0)
}

/// The next fire time for a recurring reminder that last fired at `fired_at`.
///
/// Advances by whole intervals until the result is strictly after `now`, so
/// a worker that was asleep for several periods fires once, not once per
/// missed period.
#[must_use]
pub fn next_occurrence(fired_at: i64, recurrence_minutes: u32, now: i64) -> i64 {
    let interval = i64::from(recurrence_minutes.max(1)) * 60_000;
    let next = fired_at.saturating_add(interval);
    if next > now {
        return next;
    }
    let missed = (now - next) / interval + 1;
    next.saturating_add(missed.saturating_mul(interval))
}

/// Maps task attributes onto deferred reminder jobs.
#[derive(Debug, Clone)]
pub struct ReminderScheduler {
    queue: Arc<dyn JobQueue>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    /// Create a scheduler writing to `queue` and reading time from `clock`.
    pub fn new(queue: Arc<dyn JobQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    /// The queue jobs are written to.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Enqueue a reminder for `task` if it is reminder-eligible.
    ///
    /// The delay is computed once, here; the job stores its absolute fire
    /// time. A pending job for the same task is replaced. When the task is
    /// not eligible nothing is enqueued and an existing job is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue rejects the job.
    pub fn schedule_if_needed(&self, task: &Task) -> Result<ScheduleOutcome, SchedulingError> {
        if !task.is_reminder_eligible() {
            debug!(task_id = task.id, "task not reminder-eligible, skipping");
            return Ok(ScheduleOutcome::NotEligible);
        }

        let (request, delay_ms) = self.request_for(task);
        let job = self.queue.enqueue_replace(request)?;
        info!(task_id = task.id, job_id = job.job_id, delay_ms, "scheduled reminder");
        Ok(ScheduleOutcome::Scheduled(job))
    }

    /// Enqueue a reminder for `task` unless one is already pending.
    ///
    /// Used to re-arm a recurring task: a job scheduled by a concurrent edit
    /// is newer than anything built here and is kept. Returns `None` when
    /// the task is not eligible or a job was already pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue rejects the job.
    pub fn schedule_if_absent(&self, task: &Task) -> Result<Option<ReminderJob>, SchedulingError> {
        if !task.is_reminder_eligible() {
            return Ok(None);
        }

        let (request, delay_ms) = self.request_for(task);
        let job = self.queue.enqueue_if_absent(request)?;
        match &job {
            Some(job) => {
                info!(task_id = task.id, job_id = job.job_id, delay_ms, "re-armed reminder");
            }
            None => debug!(task_id = task.id, "reminder already pending, not re-arming"),
        }
        Ok(job)
    }

    /// The job request for `task`, with its delay computed once, now.
    fn request_for(&self, task: &Task) -> (JobRequest, i64) {
        let now = self.clock.now_millis();
        let delay_ms = reminder_delay(task, now);
        (JobRequest::for_task(task, now.saturating_add(delay_ms)), delay_ms)
    }

    /// Cancel the pending reminder for a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be updated.
    pub fn cancel(&self, task_id: TaskId) -> Result<bool, SchedulingError> {
        let cancelled = self.queue.cancel(task_id)?;
        if cancelled {
            info!(task_id, "cancelled reminder");
        }
        Ok(cancelled)
    }

    /// Cancel every pending reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be updated.
    pub fn cancel_all(&self) -> Result<usize, SchedulingError> {
        let count = self.queue.cancel_all()?;
        info!(count, "cancelled all reminders");
        Ok(count)
    }

    /// The pending reminder for a task, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn pending(&self, task_id: TaskId) -> Result<Option<ReminderJob>, SchedulingError> {
        self.queue.pending(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::queue::SqliteJobQueue;
    use crate::tasks::NewTask;
    use crate::testing::ManualClock;

    const NOW: i64 = 1_700_000_000_000;

    fn scheduler() -> (Arc<ManualClock>, ReminderScheduler) {
        let clock = Arc::new(ManualClock::new(NOW));
        let queue = Arc::new(SqliteJobQueue::in_memory().unwrap());
        (clock.clone(), ReminderScheduler::new(queue, clock))
    }

    #[test]
    fn test_delay_for_future_time() {
        let task = NewTask::new("a").remind_at(NOW + 60_000).into_task(1, NOW);
        assert_eq!(reminder_delay(&task, NOW), 60_000);
    }

    #[test]
    fn test_delay_clamped_for_past_time() {
        let task = NewTask::new("a").remind_at(NOW - 5_000).into_task(1, NOW);
        assert_eq!(reminder_delay(&task, NOW), 0);
    }

    #[test]
    fn test_delay_zero_without_time() {
        let task = NewTask::new("a").recurring_every(15).into_task(1, NOW);
        assert_eq!(reminder_delay(&task, NOW), 0);
    }

    #[test]
    fn test_next_occurrence_one_interval_ahead() {
        assert_eq!(next_occurrence(NOW, 15, NOW), NOW + 15 * 60_000);
    }

    #[test]
    fn test_next_occurrence_skips_missed_periods() {
        let later = NOW + 3 * 60_000 + 1;
        assert_eq!(next_occurrence(NOW, 1, later), NOW + 4 * 60_000);
        assert_eq!(next_occurrence(NOW, 1, NOW + 60_000), NOW + 2 * 60_000);
    }

    #[test]
    fn test_not_eligible_enqueues_nothing() {
        let (_clock, scheduler) = scheduler();
        let task = NewTask::new("Plain").into_task(1, NOW);

        assert_eq!(scheduler.schedule_if_needed(&task).unwrap(), ScheduleOutcome::NotEligible);
        assert!(scheduler.pending(1).unwrap().is_none());
    }

    #[test]
    fn test_not_eligible_leaves_existing_job() {
        let (_clock, scheduler) = scheduler();
        let mut task = NewTask::new("Call mum").remind_at(NOW + 1_000).into_task(1, NOW);
        scheduler.schedule_if_needed(&task).unwrap();

        task.next_run_at = 0;
        assert_eq!(scheduler.schedule_if_needed(&task).unwrap(), ScheduleOutcome::NotEligible);
        assert!(scheduler.pending(1).unwrap().is_some());
    }

    #[test]
    fn test_schedules_future_reminder() {
        let (_clock, scheduler) = scheduler();
        let task = NewTask::new("Buy milk").remind_at(NOW + 60_000).into_task(1, NOW);

        let ScheduleOutcome::Scheduled(job) = scheduler.schedule_if_needed(&task).unwrap() else {
            panic!("expected a scheduled job");
        };
        assert_eq!(job.task_id, 1);
        assert_eq!(job.fire_at, NOW + 60_000);
        assert_eq!(job.title, "Reminder: Buy milk");
        assert_eq!(job.body, "Buy milk");
    }

    #[test]
    fn test_recurring_without_time_fires_now() {
        let (_clock, scheduler) = scheduler();
        let task = NewTask::new("Stretch").recurring_every(30).into_task(2, NOW);

        let ScheduleOutcome::Scheduled(job) = scheduler.schedule_if_needed(&task).unwrap() else {
            panic!("expected a scheduled job");
        };
        assert_eq!(job.fire_at, NOW);
    }

    #[test]
    fn test_reschedule_replaces_job() {
        let (clock, scheduler) = scheduler();
        let mut task = NewTask::new("Buy milk").remind_at(NOW + 60_000).into_task(1, NOW);
        scheduler.schedule_if_needed(&task).unwrap();

        clock.advance_millis(10_000);
        task.next_run_at = NOW + 120_000;
        scheduler.schedule_if_needed(&task).unwrap();

        let jobs = scheduler.queue().list().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].fire_at, NOW + 120_000);
    }

    #[test]
    fn test_delay_far_future_does_not_overflow() {
        let task = NewTask::new("a").remind_at(i64::MAX).into_task(1, NOW);
        assert_eq!(reminder_delay(&task, NOW), i64::MAX - NOW);
    }

    #[test]
    fn test_schedule_if_absent_keeps_pending_job() {
        let (_clock, scheduler) = scheduler();
        let mut task = NewTask::new("Stretch").recurring_every(15).into_task(1, NOW);
        task.next_run_at = NOW + 60_000;
        scheduler.schedule_if_needed(&task).unwrap();

        let mut stale = task.clone();
        stale.description = "stale".to_string();
        stale.next_run_at = NOW + 900_000;
        assert!(scheduler.schedule_if_absent(&stale).unwrap().is_none());

        let pending = scheduler.pending(1).unwrap().unwrap();
        assert_eq!(pending.body, "Stretch");
        assert_eq!(pending.fire_at, NOW + 60_000);
    }

    #[test]
    fn test_schedule_if_absent_arms_idle_task() {
        let (_clock, scheduler) = scheduler();
        let mut task = NewTask::new("Stretch").recurring_every(15).into_task(1, NOW);
        task.next_run_at = NOW + 900_000;

        let job = scheduler.schedule_if_absent(&task).unwrap().unwrap();
        assert_eq!(job.fire_at, NOW + 900_000);

        let plain = NewTask::new("Plain").into_task(2, NOW);
        assert!(scheduler.schedule_if_absent(&plain).unwrap().is_none());
        assert!(scheduler.pending(2).unwrap().is_none());
    }

    #[test]
    fn test_cancel() {
        let (_clock, scheduler) = scheduler();
        let task = NewTask::new("a").remind_at(NOW + 1).into_task(1, NOW);
        scheduler.schedule_if_needed(&task).unwrap();

        assert!(scheduler.cancel(1).unwrap());
        assert!(!scheduler.cancel(1).unwrap());
        assert_eq!(scheduler.cancel_all().unwrap(), 0);
    }
}
