//! Service configuration.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! JSON file and `F1STATS_*` environment variables. A `.env` file in the
//! working directory is read into the environment first.
//!
//! The JSON file is `config/default.json` when it exists, or whatever
//! `F1STATS_CONFIG` points at.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use f1stats_core::{RefreshConfig, UpstreamConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
const CONFIG_PATH_VAR: &str = "F1STATS_CONFIG";

/// Config file used when `F1STATS_CONFIG` is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.json";

/// Redis URL that selects the in-process store instead
pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: String,
    pub listener: Listener,
    pub redis_url: String,
    /// JSON file of extra nationality to flag entries.
    pub flags_path: Option<PathBuf>,
    /// Directory for daily log files. Logs only go to stderr when unset.
    pub log_dir: Option<PathBuf>,
    pub upstream: UpstreamConfig,
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            listener: Listener::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            flags_path: None,
            log_dir: None,
            upstream: UpstreamConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            }
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Apply `F1STATS_*` overrides, looking each variable up with `var`.
    fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = var("F1STATS_ENVIRONMENT") {
            self.environment = environment;
        }
        if let Some(url) = var("F1STATS_REDIS_URL") {
            self.redis_url = url;
        }
        if let Some(host) = var("F1STATS_HOST") {
            self.listener.host = host;
        }
        if let Some(port) = var("F1STATS_PORT") {
            self.listener.port = port
                .parse()
                .with_context(|| format!("F1STATS_PORT is not a valid port: {}", port))?;
        }
        if let Some(url) = var("F1STATS_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(dir) = var("F1STATS_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn uses_memory_store(&self) -> bool {
        self.redis_url == MEMORY_STORE_URL
    }
}
