//! Snapshot publishing for task store subscribers.
//!
//! The store pushes an immutable [`Snapshot`] of the whole collection after
//! every durable write. Delivery goes through a `tokio::sync::watch` channel,
//! which keeps only the latest value: a slow subscriber skips intermediate
//! snapshots instead of holding up the writer, and never observes an older
//! snapshot after a newer one.

use crate::tasks::models::Task;
use std::sync::Arc;
use tokio::sync::watch;

/// An immutable view of the full task collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Monotonic counter, bumped once per published write.
    pub version: u64,
    /// Every task in the store, in id order.
    pub tasks: Arc<[Task]>,
}

impl Snapshot {
    /// Build a snapshot from the tasks read back after a write.
    #[must_use]
    pub fn new(version: u64, tasks: Vec<Task>) -> Self {
        Self { version, tasks: tasks.into() }
    }

    /// Number of tasks in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the snapshot holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Publisher half, owned by the store.
#[derive(Debug)]
pub(crate) struct SnapshotPublisher {
    sender: watch::Sender<Snapshot>,
}

impl SnapshotPublisher {
    pub(crate) fn new(initial: Vec<Task>) -> Self {
        let (sender, _) = watch::channel(Snapshot::new(0, initial));
        Self { sender }
    }

    /// Replace the current snapshot and wake subscribers.
    ///
    /// Callers hold the store's write guard, so versions are published in order.
    pub(crate) fn publish(&self, tasks: Vec<Task>) -> u64 {
        let version = self.sender.borrow().version + 1;
        self.sender.send_replace(Snapshot::new(version, tasks));
        version
    }

    pub(crate) fn current(&self) -> Snapshot {
        self.sender.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe(), primed: false }
    }
}

/// A restartable stream of collection snapshots.
///
/// The first call to [`next`](Self::next) or [`try_next`](Self::try_next)
/// yields the snapshot current at subscription time. After that a value is
/// yielded only when the store has published something newer. Dropping the
/// subscription and calling `subscribe` again starts over.
#[derive(Debug)]
pub struct Subscription {
    receiver: watch::Receiver<Snapshot>,
    primed: bool,
}

impl Subscription {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Return the next snapshot if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        if self.receiver.has_changed().unwrap_or(false) {
            return Some(self.receiver.borrow_and_update().clone());
        }
        None
    }

    /// The most recent snapshot, whether or not it has been yielded yet.
    #[must_use]
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }
}
