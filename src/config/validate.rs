// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, MainQueueSection, RawConfigFile, SchedulerConfig, SchedulerSection,
    WorkloadSection, default_worker_threads,
};
use crate::errors::{Result, SchedulerError};
use crate::types::MainQueueBudget;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SchedulerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_scheduler(&raw.scheduler)?;
        let budget = validate_main_queue(&raw.main_queue)?;
        validate_workload(&raw.workload)?;

        let scheduler = SchedulerConfig {
            worker_threads: raw
                .scheduler
                .worker_threads
                .unwrap_or_else(default_worker_threads),
            thread_name: raw.scheduler.thread_name,
            stack_size: raw.scheduler.stack_size,
            park_timeout: Duration::from_millis(raw.scheduler.park_timeout_ms),
            table_shards: raw.scheduler.table_shards,
            max_tasks: raw.scheduler.max_tasks,
            main_queue_budget: budget,
        };

        Ok(ConfigFile::new_unchecked(scheduler, raw.workload))
    }
}

/// Check a raw config without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduler(&cfg.scheduler)?;
    validate_main_queue(&cfg.main_queue)?;
    validate_workload(&cfg.workload)?;
    Ok(())
}

fn validate_scheduler(section: &SchedulerSection) -> Result<()> {
    if section.worker_threads == Some(0) {
        return Err(SchedulerError::ConfigError(
            "[scheduler].worker_threads must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.table_shards == 0 {
        return Err(SchedulerError::ConfigError(
            "[scheduler].table_shards must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.park_timeout_ms == 0 {
        return Err(SchedulerError::ConfigError(
            "[scheduler].park_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.thread_name.is_empty() || section.thread_name.contains('\0') {
        return Err(SchedulerError::ConfigError(format!(
            "[scheduler].thread_name must be non-empty and free of NUL bytes (got {:?})",
            section.thread_name
        )));
    }

    if section.max_tasks == Some(0) {
        return Err(SchedulerError::ConfigError(
            "[scheduler].max_tasks must be >= 1 when set".to_string(),
        ));
    }

    if section.stack_size == Some(0) {
        return Err(SchedulerError::ConfigError(
            "[scheduler].stack_size must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_main_queue(section: &MainQueueSection) -> Result<Option<MainQueueBudget>> {
    match (section.budget_tasks, section.budget_ms) {
        (Some(_), Some(_)) => Err(SchedulerError::ConfigError(
            "[main_queue] accepts either budget_tasks or budget_ms, not both".to_string(),
        )),
        (Some(0), None) => Err(SchedulerError::ConfigError(
            "[main_queue].budget_tasks must be >= 1 (got 0)".to_string(),
        )),
        (None, Some(0)) => Err(SchedulerError::ConfigError(
            "[main_queue].budget_ms must be >= 1 (got 0)".to_string(),
        )),
        (Some(n), None) => Ok(Some(MainQueueBudget::Tasks(n))),
        (None, Some(ms)) => Ok(Some(MainQueueBudget::Time(Duration::from_millis(ms)))),
        (None, None) => Ok(None),
    }
}

fn validate_workload(section: &WorkloadSection) -> Result<()> {
    if section.chunk == 0 {
        return Err(SchedulerError::ConfigError(
            "[workload].chunk must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
