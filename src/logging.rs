// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter resolution, first match wins:
//! 1. `--log-level` applies one level to the whole crate.
//! 2. `TASKSCHED_LOG` holds full `EnvFilter` directives, so hot paths can be
//!    opened up selectively, e.g.
//!    `TASKSCHED_LOG=info,tasksched::scheduler=trace`.
//! 3. `info`.
//!
//! Output goes to stderr; stdout only carries the run report.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

const LOG_ENV: &str = "TASKSCHED_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = resolve_filter(cli_level)?;

    // Worker thread names carry the pool index.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

fn resolve_filter(cli_level: Option<LogLevel>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level_directive(level)));
    }

    match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives.trim())
            .with_context(|| format!("invalid {LOG_ENV} filter: {directives:?}")),
        _ => Ok(EnvFilter::new("info")),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
