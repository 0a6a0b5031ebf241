// src/pool/mod.rs

//! Worker pool.
//!
//! - [`worker`] holds the loop each worker thread runs.
//! - [`registry`] maps OS threads to the stable indices hooks report.
//!
//! The pool itself only owns the join handles; all queue and task state
//! lives in the scheduler's shared state.

pub(crate) mod registry;
pub(crate) mod worker;

use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::errors::Result;
use crate::scheduler::shared::Shared;

pub(crate) use registry::ThreadRegistry;

#[derive(Debug)]
struct WorkerThread {
    index: usize,
    handle: thread::JoinHandle<()>,
}

/// Lifecycle of the pool as seen by the facade.
#[derive(Debug, Default)]
pub(crate) enum PoolState {
    #[default]
    Idle,
    Running(WorkerPool),
    Stopped,
}

#[derive(Debug)]
pub(crate) struct WorkerPool {
    workers: Vec<WorkerThread>,
}

impl WorkerPool {
    /// Spawn `count` workers with indices `1..=count`.
    ///
    /// If a spawn fails, the workers already started are left running; the
    /// caller is expected to keep the partial pool so shutdown can join it.
    pub(crate) fn spawn(shared: &Arc<Shared>, count: usize) -> (Self, Result<()>) {
        let cfg = shared.config();
        let mut workers = Vec::with_capacity(count);

        for index in 1..=count {
            let mut builder = thread::Builder::new().name(format!("{}-{}", cfg.thread_name, index));
            if let Some(stack_size) = cfg.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let worker_shared = Arc::clone(shared);
            match builder.spawn(move || worker::run_worker(worker_shared, index)) {
                Ok(handle) => workers.push(WorkerThread { index, handle }),
                Err(e) => {
                    warn!(thread_index = index, error = %e, "failed to spawn worker thread");
                    return (Self { workers }, Err(e.into()));
                }
            }
        }

        info!(workers = count, "worker pool started");
        (Self { workers }, Ok(()))
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Join every worker. Callers must raise the exit flag first.
    pub(crate) fn join(self) -> Result<()> {
        let panicked = self
            .workers
            .into_iter()
            .filter_map(|w| w.handle.join().err().map(|_| w.index))
            .collect::<Vec<_>>();

        if panicked.is_empty() {
            info!("worker pool joined");
            Ok(())
        } else {
            Err(anyhow!("{} worker thread(s) panicked: {:?}", panicked.len(), panicked).into())
        }
    }
}
