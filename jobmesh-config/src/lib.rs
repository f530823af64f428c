//! Configuration loading for the jobmesh engine.
//!
//! A raw file with optional sections is merged over built-in defaults, then
//! `JOBMESH_*` environment variables are applied on top. The file format is
//! inferred from the extension; each parser sits behind a feature flag.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Raw, all-optional view of a configuration file.
#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub store: Option<StoreSection>,
    #[serde(default)]
    pub worker: Option<WorkerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Deserialize)]
pub struct StoreSection {
    /// `memory` or `mongodb`.
    pub backend: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerSection {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub backoff_secs: Option<u64>,
    #[serde(default)]
    pub watch_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s; // suppress unused warning
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreConfig {
    pub backend: String,
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerConfig {
    pub count: usize,
    pub backoff_secs: u64,
    pub watch_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: "mongodb".to_string(),
                uri: "mongodb://localhost:27017".to_string(),
                database: "jobmesh".to_string(),
                collection: "jobs".to_string(),
            },
            worker: WorkerConfig {
                count: 4,
                backoff_secs: 1,
                watch_dir: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, ()> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(()),
    }
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(store) = raw.store {
            cfg.store.backend = store.backend;
            apply_opt!(cfg.store.uri, store.uri);
            apply_opt!(cfg.store.database, store.database);
            apply_opt!(cfg.store.collection, store.collection);
        }
        if let Some(worker) = raw.worker {
            apply_opt!(cfg.worker.count, worker.count);
            apply_opt!(cfg.worker.backoff_secs, worker.backoff_secs);
            apply_opt!(cfg.worker.watch_dir, worker.watch_dir, wrap);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

/// Helper to parse env var as a specific type
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Store
    if let Some(v) = env_str("JOBMESH_STORE_BACKEND") {
        cfg.store.backend = v;
    }
    if let Some(v) = env_str("JOBMESH_STORE_URI") {
        cfg.store.uri = v;
    }
    if let Some(v) = env_str("JOBMESH_STORE_DATABASE") {
        cfg.store.database = v;
    }
    if let Some(v) = env_str("JOBMESH_STORE_COLLECTION") {
        cfg.store.collection = v;
    }

    // Worker
    if let Some(v) = env_parse::<usize>("JOBMESH_WORKER_COUNT")? {
        cfg.worker.count = v;
    }
    if let Some(v) = env_parse::<u64>("JOBMESH_WORKER_BACKOFF_SECS")? {
        cfg.worker.backoff_secs = v;
    }
    if let Some(v) = env_str("JOBMESH_WORKER_WATCH_DIR") {
        cfg.worker.watch_dir = Some(v);
    }

    // Logging
    if let Some(v) = env_str("JOBMESH_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("JOBMESH_LOG_JSON")? {
        cfg.logging.json = v;
    }

    Ok(())
}

/// Validate an effective configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    match cfg.store.backend.as_str() {
        "memory" => {}
        "mongodb" => {
            if cfg.store.uri.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "store.uri must be set for the mongodb backend".into(),
                ));
            }
            if cfg.store.database.trim().is_empty() || cfg.store.collection.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "store.database and store.collection must be non-empty".into(),
                ));
            }
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "unknown store backend '{}', expected 'memory' or 'mongodb'",
                other
            )))
        }
    }

    if cfg.worker.count == 0 {
        return Err(ConfigError::Validation(
            "worker.count must be at least 1".into(),
        ));
    }

    Ok(())
}
