// src/task/record.rs

//! Per-task state owned by the task table.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::task::Handle;
use crate::task::closure::TaskFn;

/// One schedulable unit.
///
/// `pending` counts the task's own unit plus one per unfinished child. The
/// task is complete exactly when it reaches zero, and it never goes back up.
///
/// The slot is recycled once the task is complete *and* released. Tasks the
/// caller never sees (parallel-for chunks) start out released.
pub(crate) struct TaskRecord {
    handle: Handle,
    name: String,
    closure: Mutex<Option<TaskFn>>,
    pending: AtomicUsize,
    queued: AtomicBool,
    released: AtomicBool,
    /// Resolved through the table; an outstanding child keeps its parent
    /// incomplete, so the slot cannot be reissued underneath it.
    parent: Option<Handle>,
}

impl TaskRecord {
    pub(crate) fn new(
        handle: Handle,
        name: String,
        closure: Option<TaskFn>,
        parent: Option<Handle>,
        released: bool,
    ) -> Self {
        Self {
            handle,
            name,
            closure: Mutex::new(closure),
            pending: AtomicUsize::new(1),
            queued: AtomicBool::new(false),
            released: AtomicBool::new(released),
            parent,
        }
    }

    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }

    /// Add one unit on behalf of a new child.
    ///
    /// Fails if the task already reached zero; a finished task is never
    /// resurrected.
    pub(crate) fn try_retain(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (p > 0).then_some(p + 1)
            })
            .is_ok()
    }

    /// Drop one unit. Returns `true` if this call completed the task.
    pub(crate) fn release_unit(&self) -> bool {
        // SeqCst pairs with `mark_released`: of a racing finish and release,
        // at least one observes both flags set.
        let prev = self.pending.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "task {} released below zero", self.handle);
        prev == 1
    }

    /// Record that the caller is done with the handle. Returns `false` if it
    /// was already released.
    pub(crate) fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Flip the task into the queued state. Returns `false` if it was
    /// already queued once.
    pub(crate) fn mark_queued(&self) -> bool {
        !self.queued.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn take_closure(&self) -> Option<TaskFn> {
        self.closure.lock().take()
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .field("queued", &self.queued.load(Ordering::Relaxed))
            .field("released", &self.released.load(Ordering::Relaxed))
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
