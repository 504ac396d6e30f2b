
use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::Level;

use crate::ipc::DEFAULT_SERVER_SOCKET_PATH;

pub const DEFAULT_SERVER_CONFIG_PATH: &str = "/var/task/image_handler/server.json";
pub const DEFAULT_METRICS_ENDPOINT: &str = "https://metrics.awssolutionsbuilder.com/generic";
pub const DEFAULT_SOLUTION_ID: &str = "SO0023";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    // anything unrecognized falls back to ERROR
    pub fn resolve(value: Option<&str>) -> Self {
        let value = value.map(|v| v.to_uppercase());
        match value.as_deref() {
            Some("DEBUG") => LogLevel::Debug,
            Some("INFO") => LogLevel::Info,
            Some("WARNING") => LogLevel::Warning,
            Some("CRITICAL") => LogLevel::Critical,
            _ => LogLevel::Error,
        }
    }

    pub fn tracing_level(&self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            // tracing has nothing above ERROR
            LogLevel::Error | LogLevel::Critical => Level::ERROR,
        }
    }
}

/// Configuration of the processing server, read from a static JSON file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: String,
    pub allow_unsafe_url: bool,
    /// Program and arguments launching the processing server. `{socket}` is
    /// replaced by `socket_path`.
    pub command: Vec<String>,
    pub probe_attempts: u32,
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub upstream_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SERVER_SOCKET_PATH.into(),
            allow_unsafe_url: false,
            command: vec![
                "/var/task/bin/image-server".into(),
                "--unix-socket".into(),
                "{socket}".into(),
            ],
            probe_attempts: 10,
            probe_interval_ms: 30,
            probe_timeout_ms: 1000,
            upstream_timeout_ms: 25000,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("server config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading server config {}", path.display()))?;
        let config: ServerConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing server config {}", path.display()))?;
        Ok(config)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn resolved_command(&self) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace("{socket}", &self.socket_path))
            .collect()
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("ALLOW_UNSAFE_URL") {
            self.allow_unsafe_url = matches!(value.as_str(), "true" | "True" | "TRUE" | "1" | "yes" | "Yes");
        }
        if let Some(value) = lookup("SERVER_SOCKET_PATH") {
            if !value.is_empty() {
                self.socket_path = value;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub endpoint: String,
    pub solution_id: String,
    pub uuid: String,
    pub version: String,
}

/// Static settings, resolved once per execution environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: LogLevel,
    pub send_anonymous_data: bool,
    pub metrics: MetricsSettings,
    pub server: ServerConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = LogLevel::resolve(lookup("LOG_LEVEL").as_deref());
        let send_anonymous_data = matches!(lookup("SEND_ANONYMOUS_DATA").as_deref(), Some("Yes") | Some("yes"));
        let metrics = MetricsSettings {
            endpoint: lookup("METRICS_ENDPOINT").unwrap_or_else(|| DEFAULT_METRICS_ENDPOINT.into()),
            solution_id: lookup("SOLUTION_ID").unwrap_or_else(|| DEFAULT_SOLUTION_ID.into()),
            uuid: lookup("UUID").unwrap_or_default(),
            version: lookup("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
        };
        let config_path = lookup("SERVER_CONFIG_PATH").unwrap_or_else(|| DEFAULT_SERVER_CONFIG_PATH.into());
        let mut server = ServerConfig::load(&config_path)?;
        server.apply_overrides(&lookup);
        Ok(Self {
            log_level,
            send_anonymous_data,
            metrics,
            server,
        })
    }
}
