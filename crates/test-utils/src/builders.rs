#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tasksched::{MainQueueBudget, Scheduler, SchedulerConfig, SchedulerHooks};

/// Builder for `SchedulerConfig` to simplify test setup.
///
/// Defaults to two workers and a short park timeout so tests stay fast.
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig {
                worker_threads: 2,
                thread_name: "test-worker".to_string(),
                stack_size: None,
                park_timeout: Duration::from_millis(1),
                table_shards: 4,
                max_tasks: None,
                main_queue_budget: None,
            },
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.worker_threads = n;
        self
    }

    pub fn shards(mut self, n: usize) -> Self {
        self.config.table_shards = n;
        self
    }

    pub fn max_tasks(mut self, n: usize) -> Self {
        self.config.max_tasks = Some(n);
        self
    }

    pub fn thread_name(mut self, name: &str) -> Self {
        self.config.thread_name = name.to_string();
        self
    }

    pub fn park_timeout(mut self, timeout: Duration) -> Self {
        self.config.park_timeout = timeout;
        self
    }

    pub fn main_budget(mut self, budget: MainQueueBudget) -> Self {
        self.config.main_queue_budget = Some(budget);
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }

    /// Build, install `hooks` and start the workers.
    pub fn start_with_hooks(self, hooks: Arc<dyn SchedulerHooks>) -> Scheduler {
        let scheduler = Scheduler::new(self.config);
        scheduler.set_hooks(hooks);
        scheduler.start().expect("failed to start scheduler");
        scheduler
    }

    pub fn start(self) -> Scheduler {
        let scheduler = Scheduler::new(self.config);
        scheduler.start().expect("failed to start scheduler");
        scheduler
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
