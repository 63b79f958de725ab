// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a JSON file named on the command line or through
//! the `PROC_POOL_CONFIG` environment variable.
//!
//! Missing required keys are fatal at boot; everything else defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config path when no CLI arg is passed.
pub const CONFIG_ENV: &str = "PROC_POOL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config path given and {CONFIG_ENV} is not set")]
    NoPath,

    #[error("unable to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("check the formatting of {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("please set config > {key} in {}", path.display())]
    Missing { key: &'static str, path: PathBuf },

    #[error("endpoint \"{0}\" is not configured under runtime > app > endpoints")]
    MissingEndpoint(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub startup: Startup,
    pub runtime: Runtime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Startup {
    pub db: Db,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub log: LogConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Db {
    /// Data directory for the document store.
    pub url: String,
    /// Database name (subdirectory under `url`).
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub path: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runtime {
    pub task: TaskConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub states: StatesConfig,
    #[serde(default)]
    pub actions: IndexMap<String, ActionSpec>,
    /// Default log-path template applied when a submit carries no `log`.
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub extra_fields: Vec<String>,
    #[serde(default)]
    pub formattable_fields: Vec<String>,
    /// Sink for the event consumer's completion records.
    pub finished_task_log: String,
    /// Enable HTTP notification of `parent_url` on lifecycle events.
    #[serde(default)]
    pub parent_notify: bool,
}

impl TaskConfig {
    /// Fields subject to `{placeholder}` interpolation at build time.
    pub fn formattable(&self) -> Vec<&str> {
        let mut fields = vec!["cmd", "log"];
        fields.extend(self.formattable_fields.iter().map(String::as_str));
        fields
    }
}

/// Per-action `[signal, resulting_status]` pair from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec(pub i32, pub String);

impl ActionSpec {
    pub fn signal(&self) -> i32 {
        self.0
    }

    pub fn status(&self) -> &str {
        &self.1
    }
}

/// Status strings bucketed by category. The four required buckets are
/// `queued`, `running`, `in_progress`, and `complete`; config may define
/// further buckets, addressable by name through the state-query endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatesConfig(pub IndexMap<String, Vec<String>>);

impl StatesConfig {
    pub fn bucket(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn queued(&self) -> &[String] {
        self.bucket("queued").unwrap_or(&[])
    }

    pub fn running(&self) -> &[String] {
        self.bucket("running").unwrap_or(&[])
    }

    pub fn in_progress(&self) -> &[String] {
        self.bucket("in_progress").unwrap_or(&[])
    }

    pub fn complete(&self) -> &[String] {
        self.bucket("complete").unwrap_or(&[])
    }

    /// True when `status` is in the `complete` bucket. Terminal tasks accept
    /// note appends only.
    pub fn is_complete(&self, status: &str) -> bool {
        self.complete().iter().any(|s| s == status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoints: IndexMap<String, String>,
}

impl Config {
    /// Resolve the config path: explicit argument, then `PROC_POOL_CONFIG`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .map_err(|_| ConfigError::NoPath)
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let missing = |key| ConfigError::Missing { key, path: path.to_path_buf() };

        if self.startup.db.url.is_empty() {
            return Err(missing("startup > db > url"));
        }
        if self.startup.db.name.is_empty() {
            return Err(missing("startup > db > name"));
        }
        if self.startup.log.path.is_empty() {
            return Err(missing("startup > log > path"));
        }
        if self.runtime.task.finished_task_log.is_empty() {
            return Err(missing("runtime > task > finished_task_log"));
        }
        for bucket in ["queued", "running", "in_progress", "complete"] {
            if self.runtime.task.states.bucket(bucket).is_none() {
                return Err(missing("runtime > task > states"));
            }
        }
        if self.runtime.app.endpoints.is_empty() {
            return Err(missing("runtime > app > endpoints"));
        }
        Ok(())
    }

    /// Look up a configured endpoint path by name.
    pub fn endpoint(&self, name: &str) -> Result<&str, ConfigError> {
        self.runtime
            .app
            .endpoints
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingEndpoint(name.to_string()))
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:9998".to_string()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
