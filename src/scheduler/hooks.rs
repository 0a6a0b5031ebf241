// src/scheduler/hooks.rs

//! Instrumentation hooks.
//!
//! The host can register a [`SchedulerHooks`] implementation to feed a
//! profiler or telemetry sink. Hooks are invoked inline on the thread doing
//! the work, so implementations must be cheap and must never block or
//! panic.
//!
//! Threads are reported by a small stable index rather than an OS thread
//! id: [`MAIN_THREAD_INDEX`] for the main thread, `1..=N` for workers, and
//! [`EXTERNAL_THREAD_INDEX`] for any other thread that happens to help
//! inside `wait`.

use tracing::{debug, trace, warn};

use crate::errors::SchedulerError;

/// Index of the thread that constructed the scheduler.
pub const MAIN_THREAD_INDEX: usize = 0;

/// Index reported for threads the scheduler does not own.
pub const EXTERNAL_THREAD_INDEX: usize = usize::MAX;

/// Callbacks invoked by the scheduler around thread and task lifecycles.
///
/// Every method has a default so implementors only override what they need.
pub trait SchedulerHooks: Send + Sync {
    /// A worker thread started, before it pulls its first task.
    fn on_thread_start(&self, _thread_index: usize) {}

    /// A worker thread left its loop during shutdown.
    fn on_thread_stop(&self, _thread_index: usize) {}

    fn on_task_start(&self, _thread_index: usize, _task: &str) {}

    fn on_task_stop(&self, _thread_index: usize, _task: &str) {}

    /// A closure failed. The task is still counted as finished.
    fn on_task_error(&self, thread_index: usize, task: &str, error: &SchedulerError) {
        warn!(thread_index, task = %task, error = %error, "task closure failed");
    }
}

/// Hooks that only keep the default behaviour.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl SchedulerHooks for NoopHooks {}

/// Hooks that forward every callback to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl SchedulerHooks for TracingHooks {
    fn on_thread_start(&self, thread_index: usize) {
        debug!(thread_index, "thread start");
    }

    fn on_thread_stop(&self, thread_index: usize) {
        debug!(thread_index, "thread stop");
    }

    fn on_task_start(&self, thread_index: usize, task: &str) {
        trace!(thread_index, task = %task, "task start");
    }

    fn on_task_stop(&self, thread_index: usize, task: &str) {
        trace!(thread_index, task = %task, "task stop");
    }
}
