// src/config/mod.rs

//! Configuration loading and validation for tasksched.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and resolve defaults into a [`SchedulerConfig`]
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    CONFIG_ENV, default_config, default_config_path, load_and_validate, load_from_path,
    load_or_default, resolve_config_path,
};
pub use model::{
    ConfigFile, MainQueueSection, RawConfigFile, SchedulerConfig, SchedulerSection,
    WorkloadSection,
};
pub use validate::validate_config;
