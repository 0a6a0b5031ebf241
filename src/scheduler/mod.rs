// src/scheduler/mod.rs

//! Public scheduler facade.
//!
//! A [`Scheduler`] is an explicit value owned by the application root and
//! cloned into whatever needs to create, run or wait on tasks (clones share
//! the same state). The thread that constructs it becomes the main thread:
//! the only thread allowed to drain the main queue or shut the scheduler
//! down.
//!
//! A handle stays valid until the caller passes it to
//! [`Scheduler::release`]; the task's slot is recycled once it is both
//! released and complete. Releasing early is fine and is how fire-and-forget
//! tasks are written.
//!
//! Typical use:
//!
//! ```no_run
//! use tasksched::Scheduler;
//!
//! let scheduler = Scheduler::with_workers(4)?;
//! let root = scheduler.create("frame")?;
//! for i in 0..8 {
//!     let child = scheduler.create_as_child(root, format!("job-{i}"), move || {
//!         // work
//!     })?;
//!     scheduler.run(child)?;
//!     scheduler.release(child)?;
//! }
//! scheduler.run(root)?;
//! scheduler.wait(root)?;
//! scheduler.release(root)?;
//! scheduler.shutdown()?;
//! # Ok::<(), tasksched::errors::SchedulerError>(())
//! ```

pub mod hooks;
pub(crate) mod shared;

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::errors::{Result, SchedulerError};
use crate::pool::{PoolState, WorkerPool};
use crate::task::closure::{self, TaskOutput};
use crate::task::Handle;
use crate::types::MainQueueBudget;

pub use hooks::{
    EXTERNAL_THREAD_INDEX, MAIN_THREAD_INDEX, NoopHooks, SchedulerHooks, TracingHooks,
};
use shared::Shared;

/// Point-in-time counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub tasks_created: u64,
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    /// Slots holding a task that has not been recycled: still running, or
    /// complete but not released.
    pub live_tasks: usize,
    pub queued_worker: usize,
    pub queued_main: usize,
    /// Tasks that were `run` and have not finished executing.
    pub in_flight: usize,
}

/// Dependency-aware task scheduler with a worker pool and a main-thread
/// queue.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
    _owner: Arc<Owner>,
}

/// Shared by every `Scheduler` clone but not by the workers, so its drop
/// marks the last user-facing owner going away.
struct Owner {
    shared: Arc<Shared>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        let started = matches!(*self.shared.pool.lock(), PoolState::Running(_));
        if !started || self.shared.is_exiting() {
            return;
        }

        // No one is left to call `shutdown`; workers drain the queue and
        // exit detached.
        warn!("scheduler dropped without shutdown; stopping workers without joining them");
        self.shared.begin_stop();
        self.shared.signal_exit();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", self.shared.config())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler without starting its workers.
    ///
    /// The calling thread is recorded as the main thread.
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "creating scheduler");
        let shared = Arc::new(Shared::new(config));
        Self {
            _owner: Arc::new(Owner {
                shared: Arc::clone(&shared),
            }),
            shared,
        }
    }

    /// Create and start a scheduler with `workers` worker threads and
    /// otherwise default settings.
    pub fn with_workers(workers: usize) -> Result<Self> {
        let config = SchedulerConfig {
            worker_threads: workers,
            ..SchedulerConfig::default()
        };
        let scheduler = Self::new(config);
        scheduler.start()?;
        Ok(scheduler)
    }

    /// Spawn the configured number of worker threads.
    pub fn start(&self) -> Result<()> {
        if self.shared.is_stopping() {
            return Err(SchedulerError::ShutdownInProgress);
        }

        let mut pool = self.shared.pool.lock();
        if !matches!(*pool, PoolState::Idle) {
            return Err(SchedulerError::AlreadyStarted);
        }

        let count = self.shared.config().worker_threads;
        let (workers, spawned) = WorkerPool::spawn(&self.shared, count);
        // Keep a partial pool so shutdown can still join what did start.
        *pool = PoolState::Running(workers);
        spawned
    }

    /// Register instrumentation hooks, replacing the previous ones.
    pub fn set_hooks(&self, hooks: Arc<dyn SchedulerHooks>) {
        self.shared.set_hooks(hooks);
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.shared.config()
    }

    /// Number of worker threads currently running.
    pub fn worker_count(&self) -> usize {
        match &*self.shared.pool.lock() {
            PoolState::Running(pool) => pool.len(),
            PoolState::Idle | PoolState::Stopped => 0,
        }
    }

    /// Index of the calling thread as reported to hooks.
    pub fn current_thread_index(&self) -> usize {
        self.shared.threads().current()
    }

    pub fn is_main_thread(&self) -> bool {
        self.shared.is_main_thread()
    }

    /// Create a closure-less join task.
    ///
    /// It completes once it has been run and every child attached to it has
    /// finished.
    pub fn create(&self, name: impl Into<String>) -> Result<Handle> {
        let record = self.shared.allocate(name.into(), None, None, false)?;
        Ok(record.handle())
    }

    /// Create a task that runs `f`. The task is not queued until [`run`].
    ///
    /// [`run`]: Scheduler::run
    pub fn create_with<F, R>(&self, name: impl Into<String>, f: F) -> Result<Handle>
    where
        F: FnOnce() -> R + Send + 'static,
        R: TaskOutput,
    {
        let record = self
            .shared
            .allocate(name.into(), Some(closure::boxed(f)), None, false)?;
        Ok(record.handle())
    }

    /// Create a task whose completion `parent` also waits for.
    ///
    /// Fails with [`SchedulerError::InvalidParent`] if `parent` is stale or
    /// already complete.
    pub fn create_as_child<F, R>(
        &self,
        parent: Handle,
        name: impl Into<String>,
        f: F,
    ) -> Result<Handle>
    where
        F: FnOnce() -> R + Send + 'static,
        R: TaskOutput,
    {
        let record = self
            .shared
            .allocate(name.into(), Some(closure::boxed(f)), Some(parent), false)?;
        Ok(record.handle())
    }

    /// Split `[begin, end)` into chunks of `step` items and run `f` once per
    /// chunk, each as a child of a returned master task.
    ///
    /// The last chunk is shorter when `step` does not divide the range. The
    /// chunks and the master are already queued when this returns; waiting
    /// on the master waits for every chunk. Chunks are recycled on their
    /// own; only the master needs a [`release`](Scheduler::release).
    ///
    /// If queuing fails partway, the chunks already queued still run and the
    /// master is recycled after them.
    pub fn create_parallel_for<F>(
        &self,
        name: impl Into<String>,
        f: F,
        begin: usize,
        end: usize,
        step: usize,
    ) -> Result<Handle>
    where
        F: Fn(Range<usize>) + Send + Sync + 'static,
    {
        if step == 0 {
            return Err(SchedulerError::InvalidRange { begin, end, step });
        }

        let name = name.into();
        let master = self.shared.allocate(name.clone(), None, None, false)?;
        let handle = master.handle();

        let queued = self
            .queue_chunks(&name, handle, Arc::new(f), begin, end, step)
            .and_then(|chunks| self.run(handle).map(|()| chunks));
        match queued {
            Ok(chunks) => {
                debug!(task = %name, master = %handle, chunks, begin, end, step, "parallel-for queued");
                Ok(handle)
            }
            Err(e) => {
                warn!(task = %name, error = %e, "parallel-for aborted while queuing chunks");
                self.shared.abandon(master);
                Err(e)
            }
        }
    }

    fn queue_chunks<F>(
        &self,
        name: &str,
        master: Handle,
        f: Arc<F>,
        begin: usize,
        end: usize,
        step: usize,
    ) -> Result<usize>
    where
        F: Fn(Range<usize>) + Send + Sync + 'static,
    {
        let mut chunks = 0usize;
        let mut start = begin;
        while start < end {
            let stop = start.saturating_add(step).min(end);
            let body = Arc::clone(&f);
            let chunk = self.shared.allocate(
                format!("{name}[{start}..{stop}]"),
                Some(closure::boxed(move || (*body)(start..stop))),
                Some(master),
                true,
            )?;
            self.run(chunk.handle())?;

            chunks += 1;
            start = stop;
        }
        Ok(chunks)
    }

    /// Queue a task for the worker pool.
    pub fn run(&self, handle: Handle) -> Result<()> {
        self.shared.enqueue(handle, false)
    }

    /// Queue a task that may only execute on the main thread, inside
    /// [`execute_main_queue`](Scheduler::execute_main_queue) or a main-thread
    /// [`wait`](Scheduler::wait).
    pub fn run_on_main_thread(&self, handle: Handle) -> Result<()> {
        self.shared.enqueue(handle, true)
    }

    /// Block until `handle` completes, executing other queued tasks
    /// meanwhile.
    ///
    /// Waiting on a task that was never run does not return.
    pub fn wait(&self, handle: Handle) -> Result<()> {
        let record = self.shared.table().get(handle)?;
        self.shared.wait_for(&record, None);
        Ok(())
    }

    /// Like [`wait`](Scheduler::wait) but gives up after `timeout`.
    ///
    /// Returns whether the task completed.
    pub fn wait_timeout(&self, handle: Handle, timeout: Duration) -> Result<bool> {
        let record = self.shared.table().get(handle)?;
        Ok(self.shared.wait_for(&record, Some(Instant::now() + timeout)))
    }

    /// Hand a handle back. The task's slot is recycled once the task has
    /// completed (immediately, if it already has); afterwards the handle is
    /// stale.
    ///
    /// Releasing twice is a no-op as long as the slot has not been reused.
    pub fn release(&self, handle: Handle) -> Result<()> {
        self.shared.release(handle)
    }

    /// Non-blocking completion check.
    pub fn is_completed(&self, handle: Handle) -> Result<bool> {
        let record = self.shared.table().get(handle)?;
        Ok(record.is_complete())
    }

    /// Drain the main queue on the calling thread, which must be the main
    /// thread.
    ///
    /// `None` drains until the queue is empty (including tasks queued by the
    /// tasks being drained). Returns the number of tasks executed.
    pub fn execute_main_queue(&self, budget: Option<MainQueueBudget>) -> Result<usize> {
        if !self.shared.is_main_thread() {
            return Err(SchedulerError::NotMainThread);
        }

        let started = Instant::now();
        let mut executed = 0usize;

        loop {
            let within_budget = match budget {
                None => true,
                Some(MainQueueBudget::Tasks(max)) => executed < max,
                Some(MainQueueBudget::Time(limit)) => started.elapsed() < limit,
            };
            if !within_budget {
                break;
            }

            let Some(handle) = self.shared.main_queue().try_pop() else {
                break;
            };
            self.shared.execute(handle, MAIN_THREAD_INDEX);
            executed += 1;
        }

        if executed > 0 {
            debug!(executed, remaining = self.shared.main_queue().len(), "drained main queue");
        }
        Ok(executed)
    }

    /// [`execute_main_queue`](Scheduler::execute_main_queue) with the
    /// configured default budget.
    pub fn pump_main_queue(&self) -> Result<usize> {
        self.execute_main_queue(self.shared.config().main_queue_budget)
    }

    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            tasks_created: counters.created.load(Ordering::Relaxed),
            tasks_executed: counters.executed.load(Ordering::Relaxed),
            tasks_failed: counters.failed.load(Ordering::Relaxed),
            live_tasks: self.shared.table().live(),
            queued_worker: self.shared.worker_queue().len(),
            queued_main: self.shared.main_queue().len(),
            in_flight: self.shared.in_flight(),
        }
    }

    /// Stop accepting tasks, execute everything already queued, then join
    /// the workers.
    ///
    /// Must be called from the main thread, which helps drain both queues.
    /// Calling it again after it has completed is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        if !self.shared.is_main_thread() {
            return Err(SchedulerError::NotMainThread);
        }
        if !self.shared.begin_stop() {
            debug!("shutdown already requested");
            return Ok(());
        }

        let pending = self.shared.in_flight();
        info!(pending, "scheduler shutting down; draining queued tasks");

        let park = self.shared.config().park_timeout;
        while self.shared.in_flight() > 0 {
            self.shared.help_once(MAIN_THREAD_INDEX, true, park);
        }

        self.shared.signal_exit();

        let state = std::mem::replace(&mut *self.shared.pool.lock(), PoolState::Stopped);
        let joined = match state {
            PoolState::Running(pool) => pool.join(),
            PoolState::Idle | PoolState::Stopped => Ok(()),
        };

        if let Err(e) = &joined {
            warn!(error = %e, "worker pool did not shut down cleanly");
        } else {
            info!("scheduler shut down");
        }
        joined
    }
}
