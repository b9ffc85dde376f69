// src/config.rs

//! Manages gateway configuration: loading, applying command-line overrides, and validation.

use crate::core::cursor::DEFAULT_BATCH_SIZE;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// The configuration file read when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "docgate.toml";

/// The kind of backend the gateway talks to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// The embedded in-process document store.
    #[default]
    Memory,
}

/// Settings for the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Addresses the embedded backend accepts connections to. Empty accepts any address.
    #[serde(default)]
    pub reachable: Vec<String>,
}

/// Settings for server-side cursors.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CursorConfig {
    /// Page size used when a request does not pass `batch_size`.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,
    /// Cursors untouched for this long are dropped. `0` keeps cursors forever.
    #[serde(default)]
    pub idle_timeout_secs: u64,
    /// How often the idle cursor reaper runs.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_reap_interval() -> u64 {
    30
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            idle_timeout_secs: 0,
            reap_interval_secs: default_reap_interval(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    27081
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// A raw representation of the config file before overrides and validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_backends")]
    backends: Vec<String>,
    #[serde(default)]
    cross_origin: bool,
    #[serde(default)]
    cursors: CursorConfig,
    #[serde(default)]
    backend: BackendConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    27080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    10000
}
fn default_backends() -> Vec<String> {
    vec!["localhost:27017".to_string()]
}

/// The final, validated gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Upper bound on requests served at once.
    pub max_clients: usize,
    /// Backend addresses connected at startup.
    pub backends: Vec<String>,
    /// Adds `Access-Control-Allow-Origin: *` to every response.
    pub cross_origin: bool,
    pub cursors: CursorConfig,
    pub backend: BackendConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            backends: default_backends(),
            cross_origin: false,
            cursors: CursorConfig::default(),
            backend: BackendConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            max_clients: raw.max_clients,
            backends: raw.backends,
            cross_origin: raw.cross_origin,
            cursors: raw.cursors,
            backend: raw.backend,
            metrics: raw.metrics,
        }
    }
}

/// Values given on the command line. They take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub port: Option<u16>,
    pub backends: Option<Vec<String>>,
    pub cross_origin: bool,
}

impl Config {
    /// Creates a new `Config` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(contents).context("Failed to parse configuration TOML")?;
        let config = Config::from(raw);
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given. Without a path, loads the default file if it exists
    /// and falls back to built-in defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                info!(
                    "No '{}' found, using the default configuration.",
                    DEFAULT_CONFIG_PATH
                );
                Ok(Self::default())
            }
        }
    }

    /// Applies command-line overrides and re-validates.
    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(backends) = overrides.backends {
            self.backends = backends;
        }
        self.cross_origin |= overrides.cross_origin;
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration for logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.cursors.default_batch_size == 0 {
            return Err(anyhow!("cursors.default_batch_size cannot be 0"));
        }
        if self.cursors.idle_timeout_secs > 0 && self.cursors.reap_interval_secs == 0 {
            return Err(anyhow!(
                "cursors.reap_interval_secs cannot be 0 when idle_timeout_secs is set"
            ));
        }
        if self.backends.iter().any(|b| b.trim().is_empty()) {
            return Err(anyhow!("backends cannot contain empty addresses"));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }

        if self.cursors.idle_timeout_secs == 0 {
            warn!("Cursor idle eviction is disabled; abandoned cursors are kept until restart.");
        }
        Ok(())
    }
}
