// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "TASKSCHED_CONFIG";

/// Read and deserialize a config file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and validate it into a [`ConfigFile`].
///
/// Missing sections and keys take their defaults; zero thread / shard
/// counts, conflicting main queue budgets and an empty workload chunk are
/// rejected.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Validated configuration built purely from defaults.
pub fn default_config() -> Result<ConfigFile> {
    ConfigFile::try_from(RawConfigFile::default())
}

/// Conventional config file name in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tasksched.toml")
}

/// Pick the config file to load, if any.
///
/// An explicit path wins, then `TASKSCHED_CONFIG`, then `Tasksched.toml`
/// when it exists. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        debug!(env = CONFIG_ENV, path = ?path, "using config from environment");
        return Some(PathBuf::from(path));
    }

    let fallback = default_config_path();
    fallback.is_file().then_some(fallback)
}

/// Load the resolved config file, or defaults when there is none.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match resolve_config_path(explicit) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_and_validate(path)
        }
        None => {
            debug!("no config file found; using defaults");
            default_config()
        }
    }
}
