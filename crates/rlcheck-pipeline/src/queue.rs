//! Work queue with completion tracking
//!
//! An unbounded FIFO plus a count of items that were enqueued but not yet
//! acknowledged. Workers acknowledge an item only after they have routed it,
//! so [`WorkQueue::await_drained`] returning means every item was fully
//! processed, not merely dequeued.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

pub struct WorkQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    outstanding: Mutex<usize>,
    drained: Condvar,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            outstanding: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    /// Add an item; never blocks
    pub fn enqueue(&self, item: T) {
        *self.outstanding.lock() += 1;
        // The queue owns a receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(item);
    }

    /// Take the next item, waiting at most `timeout`
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Acknowledge one dequeued item as fully processed
    pub fn task_done(&self) {
        let mut outstanding = self.outstanding.lock();
        debug_assert!(*outstanding > 0, "task_done called more often than enqueue");
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.drained.notify_all();
        }
    }

    /// Guard that acknowledges one item when dropped
    ///
    /// Take it right after a successful `dequeue`; the item is acknowledged
    /// even if processing unwinds.
    pub fn completion(&self) -> TaskDone<'_, T> {
        TaskDone { queue: self }
    }

    /// Block until every enqueued item has been acknowledged
    pub fn await_drained(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.drained.wait(&mut outstanding);
        }
    }

    /// Items enqueued but not yet acknowledged
    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Acknowledges one queue item on drop
#[must_use = "the item is acknowledged as soon as the guard is dropped"]
pub struct TaskDone<'q, T> {
    queue: &'q WorkQueue<T>,
}

impl<T> Drop for TaskDone<'_, T> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}
