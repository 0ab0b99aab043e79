//! The task board: storage plus reminders behind one surface.
//!
//! Every task mutation is committed first and scheduled second. A scheduling
//! failure never rolls back the write; it is reported in [`Saved::reminder`]
//! and logged.

use crate::config::AppConfig;
use crate::error::{Result, TaskNotFound};
use crate::paths;
use crate::reminders::{
    next_occurrence, DeliveryReport, JobQueue, NotificationChannel, NotificationDispatcher,
    ReminderJob, ReminderScheduler, ScheduleOutcome, SchedulingError, SqliteJobQueue,
};
use crate::tasks::{NewTask, SqliteTaskStore, Subscription, Task, TaskId, TaskStore};
use crate::traits::{Clock, Notifier, SystemClock};
use crate::view::{compose, TaskView, ViewQuery};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to the reminder after a save.
#[derive(Debug)]
pub enum ReminderStatus {
    /// A job is pending for the task.
    Scheduled(ReminderJob),
    /// Nothing was scheduled. Any earlier job was left alone.
    NotScheduled,
    /// The task was saved but its reminder could not be scheduled.
    Failed(SchedulingError),
}

impl ReminderStatus {
    /// The pending job, if one was scheduled.
    #[must_use]
    pub const fn job(&self) -> Option<&ReminderJob> {
        match self {
            Self::Scheduled(job) => Some(job),
            Self::NotScheduled | Self::Failed(_) => None,
        }
    }
}

/// Result of a successful save.
#[derive(Debug)]
pub struct Saved {
    /// Id of the saved task.
    pub id: TaskId,
    /// Outcome of the follow-up scheduling step.
    pub reminder: ReminderStatus,
}

/// Tasks, their reminder jobs, and notification delivery.
pub struct TaskBoard {
    store: Arc<dyn TaskStore>,
    scheduler: ReminderScheduler,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("scheduler", &self.scheduler)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl TaskBoard {
    /// Assemble a board from its parts.
    pub fn new(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn JobQueue>,
        notifier: Arc<dyn Notifier>,
        channel: NotificationChannel,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scheduler: ReminderScheduler::new(queue, Arc::clone(&clock)),
            dispatcher: NotificationDispatcher::new(notifier, channel),
            clock,
        }
    }

    /// Open the board stored in `data_dir`.
    ///
    /// Creates the notification channel up front. A channel failure here is
    /// logged and retried on first delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if either database cannot be opened.
    pub fn open(data_dir: &Path, config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store =
            SqliteTaskStore::with_clock(paths::tasks_db_path(data_dir), Arc::clone(&clock))?;
        let queue = SqliteJobQueue::new(paths::jobs_db_path(data_dir))?;
        let board =
            Self::new(Arc::new(store), Arc::new(queue), notifier, config.channel(), clock);

        if let Err(e) = board.dispatcher.ensure_channel() {
            warn!("notification channel not ready: {e}");
        }
        info!(data_dir = %data_dir.display(), "opened task board");
        Ok(board)
    }

    /// The underlying task store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// The reminder scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// The notification dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    fn arm(&self, task: &Task) -> ReminderStatus {
        match self.scheduler.schedule_if_needed(task) {
            Ok(ScheduleOutcome::Scheduled(job)) => ReminderStatus::Scheduled(job),
            Ok(ScheduleOutcome::NotEligible) => ReminderStatus::NotScheduled,
            Err(e) => {
                warn!(task_id = task.id, "task saved but reminder not scheduled: {e}");
                ReminderStatus::Failed(e)
            }
        }
    }

    /// Create a task and schedule its reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is invalid or cannot be stored.
    pub fn add_task(&self, task: NewTask) -> Result<Saved> {
        let id = self.store.create(task)?;
        let stored = self.store.get(id)?.ok_or(TaskNotFound(id))?;
        Ok(Saved { id, reminder: self.arm(&stored) })
    }

    /// Replace a task and reschedule its reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is invalid or does not exist.
    pub fn update_task(&self, task: Task) -> Result<Saved> {
        self.store.update(&task)?;
        Ok(Saved { id: task.id, reminder: self.arm(&task) })
    }

    /// Flip a task's completion state.
    ///
    /// Reopening a task re-arms its reminder. Completing one does not cancel
    /// a pending reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist.
    pub fn toggle_completion(&self, task: &Task) -> Result<Saved> {
        let mut toggled = task.clone();
        toggled.is_completed = !toggled.is_completed;
        self.store.update(&toggled)?;

        let reminder = if toggled.is_completed {
            ReminderStatus::NotScheduled
        } else {
            self.arm(&toggled)
        };
        Ok(Saved { id: toggled.id, reminder })
    }

    /// Delete a task and cancel its pending reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store fails.
    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let removed = self.store.delete(id)?;
        if let Err(e) = self.scheduler.cancel(id) {
            warn!(task_id = id, "task deleted but reminder not cancelled: {e}");
        }
        Ok(removed)
    }

    /// Delete every task and cancel every pending reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store fails.
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.store.delete_all()?;
        if let Err(e) = self.scheduler.cancel_all() {
            warn!("tasks cleared but reminders not cancelled: {e}");
        }
        Ok(removed)
    }

    /// Every task, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store fails.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.store.get_all()
    }

    /// A task by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store fails.
    pub fn get(&self, id: TaskId) -> Result<Option<Task>> {
        self.store.get(id)
    }

    /// Subscribe to collection snapshots.
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// A view primed with the current collection.
    pub fn view(&self, query: ViewQuery) -> TaskView {
        let mut view = TaskView::new(query);
        view.apply_snapshot(self.store.subscribe().latest());
        view
    }

    /// The current collection, filtered, searched, and sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store fails.
    pub fn list(&self, query: &ViewQuery) -> Result<Vec<Task>> {
        Ok(compose(&self.store.get_all()?, query))
    }

    /// Deliver every due reminder and re-arm recurring tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the job queue cannot be read.
    pub fn run_due_reminders(&self) -> std::result::Result<Vec<DeliveryReport>, SchedulingError> {
        let now = self.clock.now_millis();
        let reports = self.dispatcher.dispatch_due(self.scheduler.queue().as_ref(), now)?;
        for report in &reports {
            self.rearm_recurring(&report.job, now);
        }
        Ok(reports)
    }

    /// How long until the soonest pending reminder is due.
    ///
    /// `None` when nothing is queued. Zero when a reminder is already due.
    ///
    /// # Errors
    ///
    /// Returns an error if the job queue cannot be read.
    pub fn until_next_reminder(&self) -> std::result::Result<Option<Duration>, SchedulingError> {
        let Some(fire_at) = self.scheduler.queue().next_fire_at()? else {
            return Ok(None);
        };
        let wait_ms = fire_at.saturating_sub(self.clock.now_millis()).max(0);
        Ok(Some(Duration::from_millis(wait_ms.unsigned_abs())))
    }

    /// Schedule the next occurrence of a delivered recurring reminder.
    ///
    /// Only `next_run_at` is written, and only if it has not changed since
    /// the task was read. The job is enqueued only if none is pending. A
    /// concurrent edit therefore always wins over the re-arm.
    fn rearm_recurring(&self, job: &ReminderJob, now: i64) {
        let task = match self.store.get(job.task_id) {
            Ok(Some(task)) => task,
            Ok(None) => return,
            Err(e) => {
                warn!(task_id = job.task_id, "could not load task to re-arm: {e}");
                return;
            }
        };
        if !task.is_recurring || task.recurrence_minutes == 0 || task.is_completed {
            return;
        }

        let next_run_at = next_occurrence(job.fire_at, task.recurrence_minutes, now);
        match self.store.advance_next_run(task.id, task.next_run_at, next_run_at) {
            Ok(true) => {}
            Ok(false) => {
                debug!(task_id = task.id, "task edited since delivery, not re-arming");
                return;
            }
            Err(e) => {
                warn!(task_id = task.id, "could not advance recurring reminder: {e}");
                return;
            }
        }

        let mut next = task;
        next.next_run_at = next_run_at;
        debug!(task_id = next.id, next_run_at, "re-arming recurring reminder");
        if let Err(e) = self.scheduler.schedule_if_absent(&next) {
            warn!(task_id = next.id, "recurring reminder not re-armed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reminders::JobRequest;
    use crate::testing::{ManualClock, RecordingNotifier, UnavailableJobQueue};
    use crate::view::{FilterMode, SortMode};
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    struct Fixture {
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        board: TaskBoard,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(NOW));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = SqliteTaskStore::in_memory(clock.clone()).unwrap();
        let queue = SqliteJobQueue::in_memory().unwrap();
        let board = TaskBoard::new(
            Arc::new(store),
            Arc::new(queue),
            notifier.clone(),
            NotificationChannel::default(),
            clock.clone(),
        );
        Fixture { clock, notifier, board }
    }

    #[test]
    fn test_add_task_with_reminder_schedules_job() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Buy milk").remind_at(NOW + 60_000)).unwrap();

        let job = saved.reminder.job().unwrap();
        assert_eq!(job.task_id, saved.id);
        assert_eq!(job.fire_at, NOW + 60_000);
        assert_eq!(job.title, "Reminder: Buy milk");
    }

    #[test]
    fn test_add_plain_task_schedules_nothing() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Plain")).unwrap();
        assert!(matches!(saved.reminder, ReminderStatus::NotScheduled));
        assert!(f.board.scheduler().queue().list().unwrap().is_empty());
    }

    #[test]
    fn test_reschedule_delivers_only_new_time() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Buy milk").remind_at(NOW + 60_000)).unwrap();

        f.clock.advance_millis(10_000);
        let mut task = f.board.get(saved.id).unwrap().unwrap();
        task.next_run_at = NOW + 120_000;
        f.board.update_task(task).unwrap();

        f.clock.set(NOW + 60_000);
        assert!(f.board.run_due_reminders().unwrap().is_empty());

        f.clock.set(NOW + 120_000);
        let reports = f.board.run_due_reminders().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(f.notifier.presented().len(), 1);
    }

    #[test]
    fn test_toggle_to_complete_leaves_job() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("a").remind_at(NOW + 1_000)).unwrap();
        let task = f.board.get(saved.id).unwrap().unwrap();

        let toggled = f.board.toggle_completion(&task).unwrap();
        assert!(matches!(toggled.reminder, ReminderStatus::NotScheduled));
        assert!(f.board.get(saved.id).unwrap().unwrap().is_completed);
        assert!(f.board.scheduler().pending(saved.id).unwrap().is_some());
    }

    #[test]
    fn test_toggle_to_pending_rearms() {
        let f = fixture();
        let saved = f
            .board
            .add_task(NewTask::new("a").remind_at(NOW + 5_000).completed())
            .unwrap();
        // Completed tasks are still eligible at creation time.
        assert!(saved.reminder.job().is_some());
        f.board.scheduler().cancel(saved.id).unwrap();

        let task = f.board.get(saved.id).unwrap().unwrap();
        let reopened = f.board.toggle_completion(&task).unwrap();
        assert_eq!(reopened.reminder.job().unwrap().fire_at, NOW + 5_000);
    }

    #[test]
    fn test_toggle_missing_task_is_not_found() {
        let f = fixture();
        let ghost = NewTask::new("ghost").into_task(99, NOW);
        assert!(matches!(f.board.toggle_completion(&ghost), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_cancels_pending_reminder() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("a").remind_at(NOW + 1_000)).unwrap();

        assert!(f.board.delete_task(saved.id).unwrap());
        assert!(f.board.scheduler().pending(saved.id).unwrap().is_none());

        f.clock.advance_millis(2_000);
        assert!(f.board.run_due_reminders().unwrap().is_empty());
        assert!(f.notifier.presented().is_empty());
    }

    #[test]
    fn test_delete_all_cancels_everything() {
        let f = fixture();
        f.board.add_task(NewTask::new("a").remind_at(NOW + 1_000)).unwrap();
        f.board.add_task(NewTask::new("b").recurring_every(5)).unwrap();

        assert_eq!(f.board.delete_all().unwrap(), 2);
        assert!(f.board.tasks().unwrap().is_empty());
        assert!(f.board.scheduler().queue().list().unwrap().is_empty());
    }

    #[test]
    fn test_scheduling_failure_keeps_task() {
        let clock = Arc::new(ManualClock::new(NOW));
        let board = TaskBoard::new(
            Arc::new(SqliteTaskStore::in_memory(clock.clone()).unwrap()),
            Arc::new(UnavailableJobQueue),
            Arc::new(RecordingNotifier::new()),
            NotificationChannel::default(),
            clock,
        );

        let saved = board.add_task(NewTask::new("Stretch").recurring_every(30)).unwrap();
        assert!(matches!(saved.reminder, ReminderStatus::Failed(_)));
        assert_eq!(board.tasks().unwrap().len(), 1);

        // Deleting still succeeds even though the cancel fails.
        assert!(board.delete_task(saved.id).unwrap());
    }

    #[test]
    fn test_recurring_task_rearms_after_delivery() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Stretch").recurring_every(30)).unwrap();
        assert_eq!(saved.reminder.job().unwrap().fire_at, NOW);

        let reports = f.board.run_due_reminders().unwrap();
        assert_eq!(reports.len(), 1);

        let task = f.board.get(saved.id).unwrap().unwrap();
        assert_eq!(task.next_run_at, NOW + 30 * 60_000);
        let next = f.board.scheduler().pending(saved.id).unwrap().unwrap();
        assert_eq!(next.fire_at, NOW + 30 * 60_000);

        f.clock.advance_millis(30 * 60_000);
        assert_eq!(f.board.run_due_reminders().unwrap().len(), 1);
        assert_eq!(f.notifier.presented().len(), 2);
    }

    #[test]
    fn test_completed_recurring_task_not_rearmed() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Stretch").recurring_every(30)).unwrap();
        let task = f.board.get(saved.id).unwrap().unwrap();
        f.board.toggle_completion(&task).unwrap();

        assert_eq!(f.board.run_due_reminders().unwrap().len(), 1);
        assert!(f.board.scheduler().pending(saved.id).unwrap().is_none());
    }

    #[test]
    fn test_one_off_reminder_not_rearmed() {
        let f = fixture();
        let saved = f.board.add_task(NewTask::new("Call").remind_at(NOW)).unwrap();

        assert_eq!(f.board.run_due_reminders().unwrap().len(), 1);
        assert!(f.board.scheduler().pending(saved.id).unwrap().is_none());
    }

    type Edit = Box<dyn FnOnce(&SqliteTaskStore) + Send>;

    /// Store that lets another writer land an edit just before the first
    /// reminder-time advance.
    struct EditBeforeAdvance {
        inner: SqliteTaskStore,
        edit: Mutex<Option<Edit>>,
    }

    impl TaskStore for EditBeforeAdvance {
        fn create(&self, task: NewTask) -> Result<TaskId> {
            self.inner.create(task)
        }

        fn get(&self, id: TaskId) -> Result<Option<Task>> {
            self.inner.get(id)
        }

        fn update(&self, task: &Task) -> Result<()> {
            self.inner.update(task)
        }

        fn advance_next_run(&self, id: TaskId, expected: i64, next_run_at: i64) -> Result<bool> {
            let edit = self.edit.lock().unwrap().take();
            if let Some(edit) = edit {
                edit(&self.inner);
            }
            self.inner.advance_next_run(id, expected, next_run_at)
        }

        fn delete(&self, id: TaskId) -> Result<bool> {
            self.inner.delete(id)
        }

        fn delete_all(&self) -> Result<usize> {
            self.inner.delete_all()
        }

        fn get_all(&self) -> Result<Vec<Task>> {
            self.inner.get_all()
        }

        fn subscribe(&self) -> Subscription {
            self.inner.subscribe()
        }
    }

    /// A board whose first re-arm races with `edit`, which writes through
    /// the store and the queue like a second process would.
    fn board_with_racing_edit(
        edit: impl FnOnce(&SqliteTaskStore, &SqliteJobQueue) + Send + 'static,
    ) -> (Arc<SqliteJobQueue>, TaskBoard) {
        let clock = Arc::new(ManualClock::new(NOW));
        let queue = Arc::new(SqliteJobQueue::in_memory().unwrap());
        let other_writer = Arc::clone(&queue);
        let edit: Edit = Box::new(move |store: &SqliteTaskStore| edit(store, &other_writer));
        let store = EditBeforeAdvance {
            inner: SqliteTaskStore::in_memory(clock.clone()).unwrap(),
            edit: Mutex::new(Some(edit)),
        };
        let board = TaskBoard::new(
            Arc::new(store),
            queue.clone(),
            Arc::new(RecordingNotifier::new()),
            NotificationChannel::default(),
            clock,
        );
        (queue, board)
    }

    #[test]
    fn test_rearm_keeps_concurrent_edit_and_its_reminder() {
        let (queue, board) = board_with_racing_edit(|store, queue| {
            let mut task = store.get(1).unwrap().unwrap();
            task.description = "user edit".to_string();
            task.next_run_at = NOW + 999_000;
            store.update(&task).unwrap();
            queue.enqueue_replace(JobRequest::for_task(&task, NOW + 999_000)).unwrap();
        });
        board.add_task(NewTask::new("Stretch").recurring_every(30)).unwrap();

        assert_eq!(board.run_due_reminders().unwrap().len(), 1);

        let task = board.get(1).unwrap().unwrap();
        assert_eq!(task.description, "user edit");
        assert_eq!(task.next_run_at, NOW + 999_000);
        let pending = queue.pending(1).unwrap().unwrap();
        assert_eq!(pending.body, "user edit");
        assert_eq!(pending.fire_at, NOW + 999_000);
        assert_eq!(queue.list().unwrap().len(), 1);
    }

    #[test]
    fn test_rearm_keeps_concurrent_description_edit() {
        let (queue, board) = board_with_racing_edit(|store, queue| {
            let mut task = store.get(1).unwrap().unwrap();
            task.description = "Stretch legs".to_string();
            store.update(&task).unwrap();
            queue.enqueue_replace(JobRequest::for_task(&task, NOW)).unwrap();
        });
        board.add_task(NewTask::new("Stretch").recurring_every(30)).unwrap();

        assert_eq!(board.run_due_reminders().unwrap().len(), 1);

        // The reminder time still advances, but nothing else is overwritten.
        let task = board.get(1).unwrap().unwrap();
        assert_eq!(task.description, "Stretch legs");
        assert_eq!(task.next_run_at, NOW + 30 * 60_000);
        let pending = queue.pending(1).unwrap().unwrap();
        assert_eq!(pending.body, "Stretch legs");
        assert_eq!(pending.fire_at, NOW);
    }

    #[test]
    fn test_until_next_reminder() {
        let f = fixture();
        assert_eq!(f.board.until_next_reminder().unwrap(), None);

        f.board.add_task(NewTask::new("Call").remind_at(NOW + 90_000)).unwrap();
        assert_eq!(f.board.until_next_reminder().unwrap(), Some(Duration::from_secs(90)));

        f.clock.advance_millis(120_000);
        assert_eq!(f.board.until_next_reminder().unwrap(), Some(Duration::ZERO));
    }

    #[test]
    fn test_list_composes_query() {
        let f = fixture();
        f.board.add_task(NewTask::new("Buy milk").with_category("Errands")).unwrap();
        f.clock.advance_millis(1);
        f.board.add_task(NewTask::new("Call mum")).unwrap();
        f.clock.advance_millis(1);
        f.board.add_task(NewTask::new("Pay rent").completed()).unwrap();

        let pending = f
            .board
            .list(&ViewQuery::new("", FilterMode::Pending, SortMode::ByName))
            .unwrap();
        let names: Vec<&str> = pending.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["Buy milk", "Call mum"]);

        let searched =
            f.board.list(&ViewQuery::new("errands", FilterMode::All, SortMode::ByDate)).unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn test_view_is_primed_with_current_tasks() {
        let f = fixture();
        f.board.add_task(NewTask::new("a")).unwrap();

        let mut view = f.board.view(ViewQuery::default());
        assert_eq!(view.tasks().len(), 1);
    }
}
