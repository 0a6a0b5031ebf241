// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::task::Handle;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The handle's generation no longer matches its slot, or it was issued
    /// by a different scheduler. Always a caller bug.
    #[error("Stale task handle: {0}")]
    StaleHandle(Handle),

    /// `create_as_child` was given a parent that is not outstanding.
    #[error("Invalid parent task: {0} is stale or already complete")]
    InvalidParent(Handle),

    /// A task closure returned an error or panicked.
    #[error("Task '{task}' failed: {reason:#}")]
    TaskClosure { task: String, reason: anyhow::Error },

    #[error("Scheduler shutdown in progress; no new tasks accepted")]
    ShutdownInProgress,

    #[error("Task {0} has already been queued")]
    AlreadyQueued(Handle),

    #[error("Operation is only allowed on the scheduler's main thread")]
    NotMainThread,

    #[error("Worker pool already started")]
    AlreadyStarted,

    /// A bounded task table has no free slot; release finished tasks.
    #[error("Task table full: {capacity} tasks are not yet recycled")]
    TaskTableFull { capacity: usize },

    #[error("Invalid parallel-for range: begin={begin} end={end} step={step}")]
    InvalidRange {
        begin: usize,
        end: usize,
        step: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;
