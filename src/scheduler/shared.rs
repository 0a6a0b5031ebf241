// src/scheduler/shared.rs

//! State shared between the facade and every worker thread, and the
//! execute / finish / help algorithms that operate on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace};

use crate::config::SchedulerConfig;
use crate::dispatch::{DispatchQueue, QueueKind};
use crate::errors::{Result, SchedulerError};
use crate::pool::{PoolState, ThreadRegistry};
use crate::scheduler::hooks::{MAIN_THREAD_INDEX, NoopHooks, SchedulerHooks};
use crate::task::closure::{self, TaskFn};
use crate::task::{Handle, TaskRecord, TaskTable};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) created: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) failed: AtomicU64,
}

pub(crate) struct Shared {
    config: SchedulerConfig,
    table: TaskTable,
    worker_queue: DispatchQueue,
    main_queue: DispatchQueue,
    hooks: RwLock<Arc<dyn SchedulerHooks>>,
    threads: ThreadRegistry,
    main_thread: ThreadId,
    pub(crate) pool: Mutex<PoolState>,
    /// Set when shutdown begins; refuses new tasks.
    stopping: AtomicBool,
    /// Set once shutdown has drained everything; workers leave their loop.
    exiting: AtomicBool,
    /// Tasks that were `run` and have not finished executing yet.
    in_flight: AtomicUsize,
    /// Threads currently inside a helping wait.
    waiters: AtomicUsize,
    pub(crate) counters: Counters,
}

impl Shared {
    /// Build the shared state. The calling thread becomes the main thread.
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        let main_thread = thread::current().id();
        let threads = ThreadRegistry::default();
        threads.register(main_thread, MAIN_THREAD_INDEX);

        Self {
            table: TaskTable::new(config.table_shards, config.max_tasks),
            worker_queue: DispatchQueue::new(QueueKind::Worker),
            main_queue: DispatchQueue::new(QueueKind::Main),
            hooks: RwLock::new(Arc::new(NoopHooks)),
            threads,
            main_thread,
            pool: Mutex::new(PoolState::Idle),
            stopping: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            waiters: AtomicUsize::new(0),
            counters: Counters::default(),
            config,
        }
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn table(&self) -> &TaskTable {
        &self.table
    }

    pub(crate) fn worker_queue(&self) -> &DispatchQueue {
        &self.worker_queue
    }

    pub(crate) fn main_queue(&self) -> &DispatchQueue {
        &self.main_queue
    }

    pub(crate) fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }

    pub(crate) fn hooks(&self) -> Arc<dyn SchedulerHooks> {
        self.hooks.read().clone()
    }

    pub(crate) fn set_hooks(&self, hooks: Arc<dyn SchedulerHooks>) {
        *self.hooks.write() = hooks;
    }

    pub(crate) fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Raise the stop flag. Returns `false` if it was already raised.
    pub(crate) fn begin_stop(&self) -> bool {
        !self.stopping.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    pub(crate) fn signal_exit(&self) {
        self.exiting.store(true, Ordering::Release);
        self.worker_queue.wake_all();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Allocate a record, optionally as a child of `parent`.
    ///
    /// `released` records are recycled as soon as they complete; the others
    /// wait for [`Shared::release`].
    pub(crate) fn allocate(
        &self,
        name: String,
        closure: Option<TaskFn>,
        parent: Option<Handle>,
        released: bool,
    ) -> Result<Arc<TaskRecord>> {
        if self.is_stopping() {
            return Err(SchedulerError::ShutdownInProgress);
        }

        let parent_record = match parent {
            Some(handle) => {
                let record = self
                    .table
                    .get(handle)
                    .map_err(|_| SchedulerError::InvalidParent(handle))?;
                if !record.try_retain() {
                    return Err(SchedulerError::InvalidParent(handle));
                }
                Some(record)
            }
            None => None,
        };

        match self.table.allocate(name, closure, parent, released) {
            Ok(record) => {
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                Ok(record)
            }
            Err(e) => {
                // Give back the unit taken on the parent; it may complete now.
                if let Some(parent) = parent_record {
                    self.finish(parent);
                }
                Err(e)
            }
        }
    }

    /// The caller is done with `handle`. Its slot is recycled once the task
    /// has also completed.
    pub(crate) fn release(&self, handle: Handle) -> Result<()> {
        let record = self.table.get(handle)?;
        if record.mark_released() && record.is_complete() {
            self.table.recycle(handle);
        }
        Ok(())
    }

    /// Drop the own unit of a task that will never be queued, and let it be
    /// recycled once its children finish.
    pub(crate) fn abandon(&self, record: Arc<TaskRecord>) {
        record.mark_released();
        if record.mark_queued() {
            self.finish(record);
        }
    }

    /// Push a task onto the queue matching its affinity.
    pub(crate) fn enqueue(&self, handle: Handle, on_main_thread: bool) -> Result<()> {
        if self.is_stopping() {
            return Err(SchedulerError::ShutdownInProgress);
        }

        let record = self.table.get(handle)?;
        if !record.mark_queued() {
            return Err(SchedulerError::AlreadyQueued(handle));
        }

        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let queue = if on_main_thread {
            &self.main_queue
        } else {
            &self.worker_queue
        };
        queue.push(handle);
        trace!(task = %record.name(), %handle, queue = ?queue.kind(), "task queued");

        // A main-thread waiter parks on the worker queue's condvar; the main
        // queue never notifies on its own.
        if on_main_thread && self.waiters.load(Ordering::Acquire) > 0 {
            self.worker_queue.notify_all();
        }

        Ok(())
    }

    /// Execute one popped task on the current thread and propagate its
    /// completion.
    pub(crate) fn execute(&self, handle: Handle, thread_index: usize) {
        let record = match self.table.get(handle) {
            Ok(record) => record,
            Err(e) => {
                // A queued task can never be recycled; this is an internal bug.
                error!(%handle, error = %e, "popped a stale handle; dropping it");
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                return;
            }
        };

        let hooks = self.hooks();
        hooks.on_task_start(thread_index, record.name());
        trace!(task = %record.name(), %handle, thread_index, "executing task");

        if let Some(body) = record.take_closure() {
            if let Err(err) = closure::invoke(record.name(), body) {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                hooks.on_task_error(thread_index, record.name(), &err);
            }
        }

        hooks.on_task_stop(thread_index, record.name());
        self.counters.executed.fetch_add(1, Ordering::Relaxed);

        self.finish(record);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Drop one unit from `record` and walk up the parent chain for as long
    /// as units reach zero.
    pub(crate) fn finish(&self, record: Arc<TaskRecord>) {
        let mut current = record;

        while current.release_unit() {
            debug!(task = %current.name(), handle = %current.handle(), "task complete");
            if current.is_released() {
                self.table.recycle(current.handle());
            }

            let Some(parent) = current.parent() else {
                break;
            };
            match self.table.get(parent) {
                Ok(record) => current = record,
                Err(e) => {
                    // A parent with an outstanding child is never recycled.
                    error!(%parent, error = %e, "parent of a finished task went stale");
                    break;
                }
            }
        }

        if self.waiters.load(Ordering::Acquire) > 0 {
            self.worker_queue.notify_all();
        }
    }

    /// Run one queued task if any is available, otherwise park on the worker
    /// queue for at most `park`. Returns `true` if a task was executed.
    ///
    /// The main queue is only consulted when the caller is the main thread.
    pub(crate) fn help_once(&self, thread_index: usize, on_main: bool, park: Duration) -> bool {
        if on_main {
            if let Some(handle) = self.main_queue.try_pop() {
                self.execute(handle, thread_index);
                return true;
            }
        }

        match self.worker_queue.pop_timeout(park) {
            Some(handle) => {
                self.execute(handle, thread_index);
                true
            }
            None => false,
        }
    }

    /// Helping wait on `record`, optionally bounded by `deadline`.
    ///
    /// Returns whether the task completed.
    pub(crate) fn wait_for(&self, record: &TaskRecord, deadline: Option<Instant>) -> bool {
        if record.is_complete() {
            return true;
        }

        let thread_index = self.threads.current();
        let on_main = self.is_main_thread();
        let _waiting = WaiterGuard::enter(&self.waiters);
        trace!(task = %record.name(), thread_index, "waiting on task");

        loop {
            if record.is_complete() {
                return true;
            }

            let mut park = self.config.park_timeout;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                park = park.min(deadline - now);
            }

            self.help_once(thread_index, on_main, park);
        }
    }
}

/// Keeps `Shared::waiters` accurate even if a helped task's hook panics.
struct WaiterGuard<'a> {
    waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    fn enter(waiters: &'a AtomicUsize) -> Self {
        waiters.fetch_add(1, Ordering::AcqRel);
        Self { waiters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}
