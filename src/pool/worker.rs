// src/pool/worker.rs

//! Worker thread body.

use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::scheduler::shared::Shared;

/// Entry point of every worker thread.
///
/// Registers the thread, then loops: pop (parking until woken when idle) and
/// execute. The loop only exits once shutdown has drained every queued task
/// and raised the exit flag.
pub(crate) fn run_worker(shared: Arc<Shared>, index: usize) {
    let id = thread::current().id();
    shared.threads().register(id, index);
    shared.hooks().on_thread_start(index);
    debug!(thread_index = index, "worker thread started");

    let mut executed = 0u64;

    while let Some(handle) = shared.worker_queue().pop_blocking(|| shared.is_exiting()) {
        shared.execute(handle, index);
        executed += 1;
    }

    debug!(thread_index = index, executed, "worker thread exiting");
    shared.hooks().on_thread_stop(index);
    shared.threads().unregister(id);
}
