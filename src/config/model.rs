// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::MainQueueBudget;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [scheduler]
/// worker_threads = 4
/// thread_name = "tasksched-worker"
/// park_timeout_ms = 2
/// table_shards = 8
///
/// [main_queue]
/// budget_tasks = 64
///
/// [workload]
/// items = 100000
/// chunk = 1024
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub main_queue: MainQueueSection,

    #[serde(default)]
    pub workload: WorkloadSection,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    /// Number of worker threads. Defaults to the available parallelism.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Worker thread name prefix; each worker appends `-<index>`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Worker stack size in bytes. Platform default when unset.
    #[serde(default)]
    pub stack_size: Option<usize>,

    /// Upper bound on a single park inside a helping wait.
    #[serde(default = "default_park_timeout_ms")]
    pub park_timeout_ms: u64,

    /// Number of independently locked shards in the task table.
    #[serde(default = "default_table_shards")]
    pub table_shards: usize,

    /// Upper bound on tasks that are not yet recycled. Unbounded when unset.
    #[serde(default)]
    pub max_tasks: Option<usize>,
}

fn default_thread_name() -> String {
    "tasksched-worker".to_string()
}

fn default_park_timeout_ms() -> u64 {
    2
}

fn default_table_shards() -> usize {
    8
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: default_thread_name(),
            stack_size: None,
            park_timeout_ms: default_park_timeout_ms(),
            table_shards: default_table_shards(),
            max_tasks: None,
        }
    }
}

/// `[main_queue]` section.
///
/// At most one of the two budgets may be set. With neither, `pump_main_queue`
/// drains the main queue fully.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainQueueSection {
    #[serde(default)]
    pub budget_tasks: Option<usize>,

    #[serde(default)]
    pub budget_ms: Option<u64>,
}

/// `[workload]` section, read only by the `tasksched` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSection {
    /// Number of items the demo parallel-for covers.
    #[serde(default = "default_items")]
    pub items: usize,

    /// Items per parallel-for chunk.
    #[serde(default = "default_chunk")]
    pub chunk: usize,

    /// Attach a main-thread finalize step to the workload.
    #[serde(default = "default_main_thread_finalize")]
    pub main_thread_finalize: bool,

    /// Simulated host frame length.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

fn default_items() -> usize {
    100_000
}

fn default_chunk() -> usize {
    1024
}

fn default_main_thread_finalize() -> bool {
    true
}

fn default_frame_ms() -> u64 {
    16
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            items: default_items(),
            chunk: default_chunk(),
            main_thread_finalize: default_main_thread_finalize(),
            frame_ms: default_frame_ms(),
        }
    }
}

/// Runtime options of a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker threads spawned by `start`. Zero is allowed: tasks then only
    /// run when a thread helps inside `wait` or during `shutdown`.
    pub worker_threads: usize,
    pub thread_name: String,
    pub stack_size: Option<usize>,
    /// Longest single park inside a helping wait. Idle workers park until
    /// woken.
    pub park_timeout: Duration,
    pub table_shards: usize,
    /// Creating a task beyond this many unrecycled ones fails with
    /// `TaskTableFull`.
    pub max_tasks: Option<usize>,
    /// Budget used by `pump_main_queue`. `None` drains fully.
    pub main_queue_budget: Option<MainQueueBudget>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            thread_name: default_thread_name(),
            stack_size: None,
            park_timeout: Duration::from_millis(default_park_timeout_ms()),
            table_shards: default_table_shards(),
            max_tasks: None,
            main_queue_budget: None,
        }
    }
}

/// Hardware concurrency, falling back to a single worker when unknown.
pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) so
/// every instance has passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerConfig,
    pub workload: WorkloadSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(scheduler: SchedulerConfig, workload: WorkloadSection) -> Self {
        Self {
            scheduler,
            workload,
        }
    }
}
