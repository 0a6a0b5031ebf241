// src/dispatch/queue.rs

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::task::Handle;

/// Which of the two dispatch queues this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Consumed by worker threads and by helping waiters.
    Worker,
    /// Consumed only by the designated main thread through an explicit pump.
    Main,
}

/// FIFO queue of task handles with its own lock and condition variable.
#[derive(Debug)]
pub(crate) struct DispatchQueue {
    kind: QueueKind,
    items: Mutex<VecDeque<Handle>>,
    ready: Condvar,
}

impl DispatchQueue {
    pub(crate) fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Append a handle.
    ///
    /// The worker queue wakes one parked consumer. The main queue is passive:
    /// the main thread is busy running its own loop and drains it on demand.
    pub(crate) fn push(&self, handle: Handle) {
        self.items.lock().push_back(handle);

        if self.kind == QueueKind::Worker {
            self.ready.notify_one();
        }
    }

    pub(crate) fn try_pop(&self) -> Option<Handle> {
        self.items.lock().pop_front()
    }

    /// Pop a handle, parking for at most `timeout` if the queue is empty.
    ///
    /// Returns `None` on timeout or on a wake-up that found nothing to do;
    /// callers re-check their own exit condition and call again.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Option<Handle> {
        let mut items = self.items.lock();
        if let Some(handle) = items.pop_front() {
            return Some(handle);
        }

        self.ready.wait_for(&mut items, timeout);
        items.pop_front()
    }

    /// Pop a handle, parking without a timeout while the queue is empty.
    ///
    /// Returns `None` only once the queue is empty and `stop` holds. `stop`
    /// is checked under the queue lock, so a flag raised before
    /// [`wake_all`](Self::wake_all) is never missed.
    pub(crate) fn pop_blocking(&self, stop: impl Fn() -> bool) -> Option<Handle> {
        let mut items = self.items.lock();
        loop {
            if let Some(handle) = items.pop_front() {
                return Some(handle);
            }
            if stop() {
                return None;
            }
            self.ready.wait(&mut items);
        }
    }

    /// Wake every thread parked on this queue.
    ///
    /// Parks bounded by a timeout re-check on their own; use
    /// [`wake_all`](Self::wake_all) after changing a `pop_blocking` stop
    /// condition.
    pub(crate) fn notify_all(&self) {
        self.ready.notify_all();
    }

    /// Like [`notify_all`](Self::notify_all), but serialised with the lock so
    /// a consumer between its stop check and its park still sees the wake.
    pub(crate) fn wake_all(&self) {
        let _items = self.items.lock();
        self.ready.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }
}
