use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{trace, warn};

use crate::MonitorDefaults;
use crate::util::{env_lookup, parse_env};

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Retention period in days (metrics older than this are deleted)
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: default_retention_days(),
        }
    }
}

impl StorageConfig {
    /// Days of metric history kept by the retention sweeper
    ///
    /// The in-memory store has no setting of its own and keeps the default.
    pub fn retention_days(&self) -> u32 {
        match self {
            StorageConfig::Sqlite { retention_days, .. } => *retention_days,
            StorageConfig::None => default_retention_days(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./pulsewatch.db")
}

fn default_retention_days() -> u32 {
    30
}

/// One year
pub const MAX_UPTIME_WINDOW_HOURS: u32 = 24 * 366;

/// Ten years
pub const MAX_RETENTION_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Storage configuration (defaults to SQLite)
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Optional bearer token guarding the REST routes
    pub auth_token: Option<String>,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_token: None,
            enable_cors: true,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_interval")]
    pub default_interval: u64,

    #[serde(default = "default_timeout")]
    pub default_timeout: u64,

    /// Upper bound on probes in flight across all monitors
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Trailing window used for the rolling uptime figure
    #[serde(default = "default_uptime_window_hours")]
    pub uptime_window_hours: u32,

    /// Largest lookback accepted by metric queries
    #[serde(default = "default_metrics_max_hours")]
    pub metrics_max_hours: u32,

    #[serde(default = "default_metrics_max_rows")]
    pub metrics_max_rows: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            default_interval: default_interval(),
            default_timeout: default_timeout(),
            max_concurrent_checks: default_max_concurrent_checks(),
            uptime_window_hours: default_uptime_window_hours(),
            metrics_max_hours: default_metrics_max_hours(),
            metrics_max_rows: default_metrics_max_rows(),
        }
    }
}

impl MonitoringConfig {
    pub fn monitor_defaults(&self) -> MonitorDefaults {
        MonitorDefaults {
            interval: self.default_interval,
            timeout: self.default_timeout,
            ..MonitorDefaults::default()
        }
    }

    pub fn uptime_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.uptime_window_hours as i64)
    }
}

fn default_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    10
}

fn default_max_concurrent_checks() -> usize {
    100
}

fn default_uptime_window_hours() -> u32 {
    24
}

fn default_metrics_max_hours() -> u32 {
    168
}

fn default_metrics_max_rows() -> usize {
    1000
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebSocketConfig {
    /// Deadline for a single outbound frame
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Idle time after which a keepalive ping is sent
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Idle time after which a silent observer is dropped
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_buffer")]
    pub observer_buffer: usize,

    #[serde(default = "default_buffer")]
    pub hub_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            write_timeout_secs: default_write_timeout_secs(),
            keepalive_secs: default_keepalive_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            observer_buffer: default_buffer(),
            hub_buffer: default_buffer(),
        }
    }
}

impl WebSocketConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_keepalive_secs() -> u64 {
    60
}

fn default_read_timeout_secs() -> u64 {
    90
}

fn default_buffer() -> usize {
    256
}

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_lookup);
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = parse_env::<SocketAddr>(&lookup, "BIND_ADDR") {
            self.server.bind_addr = addr;
        } else {
            if let Some(host) = parse_env::<std::net::IpAddr>(&lookup, "HOST") {
                self.server.bind_addr.set_ip(host);
            }
            if let Some(port) = parse_env::<u16>(&lookup, "PORT") {
                self.server.bind_addr.set_port(port);
            }
        }

        if let Some(token) = lookup("API_TOKEN").filter(|t| !t.is_empty()) {
            self.server.auth_token = Some(token);
        }

        if let Some(interval) = parse_env(&lookup, "DEFAULT_INTERVAL") {
            self.monitoring.default_interval = interval;
        }
        if let Some(timeout) = parse_env(&lookup, "DEFAULT_TIMEOUT") {
            self.monitoring.default_timeout = timeout;
        }
        if let Some(max) = parse_env(&lookup, "MAX_CONCURRENT_CHECKS") {
            self.monitoring.max_concurrent_checks = max;
        }

        let env_path = lookup("DATABASE_PATH").filter(|p| !p.is_empty());
        let env_retention = parse_env::<u32>(&lookup, "METRICS_RETENTION_DAYS");
        if env_path.is_some() || env_retention.is_some() {
            let (path, retention_days) = match &self.storage {
                StorageConfig::Sqlite {
                    path,
                    retention_days,
                } => (path.clone(), *retention_days),
                StorageConfig::None => (default_sqlite_path(), default_retention_days()),
            };

            self.storage = StorageConfig::Sqlite {
                path: env_path.map(PathBuf::from).unwrap_or(path),
                retention_days: env_retention.unwrap_or(retention_days),
            };
        }
    }

    /// Reject unusable settings and warn about questionable ones
    pub fn validate(&self) -> anyhow::Result<()> {
        let monitoring = &self.monitoring;

        if monitoring.max_concurrent_checks == 0 {
            bail!("max_concurrent_checks must be at least 1");
        }
        if monitoring.default_interval == 0 || monitoring.default_timeout == 0 {
            bail!("default_interval and default_timeout must be at least 1 second");
        }
        if !(1..=MAX_UPTIME_WINDOW_HOURS).contains(&monitoring.uptime_window_hours) {
            bail!(
                "uptime_window_hours must be between 1 and {}",
                MAX_UPTIME_WINDOW_HOURS
            );
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.storage.retention_days()) {
            bail!("retention_days must be between 1 and {}", MAX_RETENTION_DAYS);
        }

        let websocket = &self.websocket;
        if websocket.observer_buffer == 0 || websocket.hub_buffer == 0 {
            bail!("websocket buffers must hold at least one message");
        }
        if websocket.keepalive_secs == 0 || websocket.write_timeout_secs == 0 {
            bail!("websocket keepalive_secs and write_timeout_secs must be at least 1");
        }
        if websocket.read_timeout_secs <= websocket.keepalive_secs {
            bail!(
                "websocket read_timeout_secs ({}) must exceed keepalive_secs ({})",
                websocket.read_timeout_secs,
                websocket.keepalive_secs
            );
        }

        if monitoring.default_interval < 5 {
            warn!(
                "default_interval is very low ({}s), this may cause high load",
                monitoring.default_interval
            );
        }
        if monitoring.default_timeout >= monitoring.default_interval {
            warn!(
                "default_timeout ({}s) should be less than default_interval ({}s)",
                monitoring.default_timeout, monitoring.default_interval
            );
        }

        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
