//! Background reminder delivery loop.

use crate::board::TaskBoard;
use crate::reminders::dispatcher::DeliveryReport;
use crate::reminders::error::SchedulingError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Polls the job queue and delivers due reminders.
#[derive(Debug, Clone)]
pub struct ReminderWorker {
    board: Arc<TaskBoard>,
    poll_interval: Duration,
}

impl ReminderWorker {
    /// Create a worker polling `board` every `poll_interval`.
    pub fn new(board: Arc<TaskBoard>, poll_interval: Duration) -> Self {
        Self { board, poll_interval }
    }

    /// Deliver whatever is due right now.
    ///
    /// The queue is `SQLite`-backed, so the pass runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or the pass panicked.
    pub async fn run_once(&self) -> Result<Vec<DeliveryReport>, SchedulingError> {
        let board = Arc::clone(&self.board);
        tokio::task::spawn_blocking(move || board.run_due_reminders())
            .await
            .map_err(|e| SchedulingError::Unavailable(format!("reminder pass aborted: {e}")))?
    }

    /// How long to sleep before the next pass.
    ///
    /// The poll interval, or less if a queued reminder comes due sooner.
    /// Polling still bounds the wait so jobs queued by other processes are
    /// picked up.
    pub async fn idle_wait(&self) -> Duration {
        let board = Arc::clone(&self.board);
        match tokio::task::spawn_blocking(move || board.until_next_reminder()).await {
            Ok(Ok(Some(until_due))) => until_due.min(self.poll_interval),
            Ok(Ok(None)) => self.poll_interval,
            Ok(Err(e)) => {
                warn!("could not read next reminder time: {e}");
                self.poll_interval
            }
            Err(e) => {
                warn!("next reminder lookup aborted: {e}");
                self.poll_interval
            }
        }
    }

    /// Run until `shutdown` is notified. Returns how many jobs were delivered.
    ///
    /// A failed pass is logged and retried on the next tick.
    pub async fn run(&self, shutdown: Arc<Notify>) -> usize {
        let poll_interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX);
        info!(poll_interval_ms, "reminder worker started");
        let mut delivered = 0;
        loop {
            match self.run_once().await {
                Ok(reports) => {
                    if !reports.is_empty() {
                        debug!(count = reports.len(), "delivered due reminders");
                    }
                    delivered += reports.len();
                }
                Err(e) => warn!("reminder pass failed: {e}"),
            }

            let wait = self.idle_wait().await;
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = shutdown.notified() => break,
            }
        }
        info!(delivered, "reminder worker stopped");
        delivered
    }
}
