// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::MainQueueBudget;

/// Command-line arguments for `tasksched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tasksched",
    version,
    about = "Run a parallel workload on the tasksched worker pool with a main-thread frame loop.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `TASKSCHED_CONFIG` or `./Tasksched.toml` is used when
    /// present, otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Override `[scheduler].worker_threads`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Override the main queue budget per frame ("32" tasks or "4ms").
    #[arg(long, value_name = "BUDGET")]
    pub main_budget: Option<MainQueueBudget>,

    /// Override `[workload].items`.
    #[arg(long, value_name = "N")]
    pub items: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
