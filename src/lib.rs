// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod pool;
pub mod scheduler;
pub mod task;
pub mod types;
pub mod workload;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};

pub use crate::config::SchedulerConfig;
pub use crate::errors::SchedulerError;
pub use crate::scheduler::{
    EXTERNAL_THREAD_INDEX, MAIN_THREAD_INDEX, NoopHooks, Scheduler, SchedulerHooks,
    SchedulerStats, TracingHooks,
};
pub use crate::task::{Handle, TaskOutput};
pub use crate::types::MainQueueBudget;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - scheduler construction and worker startup
/// - the demo workload frame loop
/// - a draining shutdown
pub fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    apply_overrides(&mut cfg, &args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scheduler = Scheduler::new(cfg.scheduler.clone());
    scheduler.set_hooks(Arc::new(TracingHooks));
    scheduler.start()?;
    info!(workers = scheduler.worker_count(), "scheduler started");

    let report = workload::run_workload(&scheduler, &cfg.workload);

    // Shut down even when the workload failed so workers are joined.
    let stopped = scheduler.shutdown();
    let report = report?;
    if let Err(e) = stopped {
        warn!(error = %e, "shutdown reported an error");
        return Err(e.into());
    }

    println!(
        "tasksched: {} items in {} chunks, sum = {}",
        report.items, report.chunks, report.sum
    );
    println!(
        "  frames = {}, main-queue tasks = {}, finalized on main thread = {}",
        report.frames, report.main_tasks, report.finalized_on_main
    );
    println!("  elapsed = {:?}", report.elapsed);
    debug!(stats = ?scheduler.stats(), "final scheduler stats");

    Ok(())
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<(), SchedulerError> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(SchedulerError::ConfigError(
                "--workers must be >= 1 (got 0)".to_string(),
            ));
        }
        cfg.scheduler.worker_threads = workers;
    }
    if let Some(budget) = args.main_budget {
        cfg.scheduler.main_queue_budget = Some(budget);
    }
    if let Some(items) = args.items {
        cfg.workload.items = items;
    }
    Ok(())
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &ConfigFile) {
    let s = &cfg.scheduler;
    println!("tasksched dry-run");
    println!("  scheduler.worker_threads = {}", s.worker_threads);
    println!("  scheduler.thread_name = {}", s.thread_name);
    match s.stack_size {
        Some(bytes) => println!("  scheduler.stack_size = {bytes}"),
        None => println!("  scheduler.stack_size = <platform default>"),
    }
    println!("  scheduler.park_timeout = {:?}", s.park_timeout);
    println!("  scheduler.table_shards = {}", s.table_shards);
    match s.max_tasks {
        Some(max) => println!("  scheduler.max_tasks = {max}"),
        None => println!("  scheduler.max_tasks = <unbounded>"),
    }
    match s.main_queue_budget {
        Some(budget) => println!("  main_queue.budget = {budget}"),
        None => println!("  main_queue.budget = <drain fully>"),
    }
    println!();

    let w = &cfg.workload;
    println!("workload:");
    println!("  items = {}", w.items);
    println!("  chunk = {}", w.chunk);
    println!("  main_thread_finalize = {}", w.main_thread_finalize);
    println!("  frame_ms = {}", w.frame_ms);

    debug!("dry-run complete (no execution)");
}
