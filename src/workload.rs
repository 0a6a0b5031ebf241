// src/workload.rs

//! Demo workload driven by the `tasksched` binary.
//!
//! Mirrors how a host application uses the scheduler: a root join task owns
//! a worker-side compute step which fans out into a parallel-for and then
//! hands its result to a main-thread finalize step. The main thread runs a
//! frame loop, draining its queue once per frame until the root completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::config::WorkloadSection;
use crate::errors::SchedulerError;
use crate::scheduler::Scheduler;

/// Outcome of one workload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadReport {
    pub items: usize,
    pub chunks: usize,
    /// Wrapping sum of `i * i` over `0..items`.
    pub sum: u64,
    pub frames: u64,
    /// Main-queue tasks drained by the per-frame pump.
    pub main_tasks: usize,
    pub finalized_on_main: bool,
    pub elapsed: Duration,
}

/// Reference result for [`run_workload`].
pub fn expected_sum(items: usize) -> u64 {
    (0..items as u64).fold(0u64, |acc, i| acc.wrapping_add(i.wrapping_mul(i)))
}

/// Run the workload on an already started scheduler.
///
/// Must be called on the scheduler's main thread.
pub fn run_workload(scheduler: &Scheduler, cfg: &WorkloadSection) -> Result<WorkloadReport> {
    if !scheduler.is_main_thread() {
        bail!("workload must be driven from the main thread");
    }

    let started = Instant::now();
    let partial = Arc::new(AtomicU64::new(0));
    let total = Arc::new(AtomicU64::new(0));
    let finalized_on_main = Arc::new(AtomicBool::new(false));

    let root = scheduler.create("workload")?;

    let compute = {
        let sched = scheduler.clone();
        let partial = Arc::clone(&partial);
        let total = Arc::clone(&total);
        let finalized_on_main = Arc::clone(&finalized_on_main);
        let items = cfg.items;
        let chunk = cfg.chunk;
        let finalize = cfg.main_thread_finalize;

        scheduler.create_as_child(root, "compute", move || -> Result<(), SchedulerError> {
            let acc = Arc::clone(&partial);
            let pf = sched.create_parallel_for(
                "sum-squares",
                move |range| {
                    let local = range
                        .map(|i| i as u64)
                        .fold(0u64, |s, i| s.wrapping_add(i.wrapping_mul(i)));
                    acc.fetch_add(local, Ordering::Relaxed);
                },
                0,
                items,
                chunk,
            )?;
            sched.wait(pf)?;
            sched.release(pf)?;

            let publish = {
                let sched = sched.clone();
                move || {
                    total.store(partial.load(Ordering::Relaxed), Ordering::Release);
                    finalized_on_main.store(sched.is_main_thread(), Ordering::Release);
                }
            };

            if finalize {
                // Still a child of `root`, so the root also waits for this.
                let fin = sched.create_as_child(root, "finalize", publish)?;
                sched.run_on_main_thread(fin)?;
                sched.release(fin)?;
            } else {
                publish();
            }
            Ok(())
        })?
    };

    scheduler.run(compute)?;
    scheduler.release(compute)?;
    scheduler.run(root)?;

    let frame = Duration::from_millis(cfg.frame_ms);
    let mut frames = 0u64;
    let mut main_tasks = 0usize;

    loop {
        main_tasks += scheduler.pump_main_queue()?;
        frames += 1;

        // Sleeping the frame off inside a timed wait lets the main thread
        // help with worker tasks too.
        if scheduler.wait_timeout(root, frame)? {
            break;
        }
        debug!(frames, "frame elapsed; workload still running");
    }
    scheduler.release(root)?;

    let sum = total.load(Ordering::Acquire);
    let expected = expected_sum(cfg.items);
    if sum != expected {
        bail!("workload sum mismatch: got {sum}, expected {expected}");
    }

    let report = WorkloadReport {
        items: cfg.items,
        chunks: cfg.items.div_ceil(cfg.chunk),
        sum,
        frames,
        main_tasks,
        finalized_on_main: finalized_on_main.load(Ordering::Acquire),
        elapsed: started.elapsed(),
    };
    info!(?report, "workload complete");
    Ok(report)
}
