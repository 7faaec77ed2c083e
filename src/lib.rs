pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod monitors;
pub mod service;
pub mod storage;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Opaque identity of a monitor
pub type MonitorId = Uuid;

/// HTTP method used when probing a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(ValidationError(format!("unsupported HTTP method: {other}"))),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Cached health status of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    Up,
    Down,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Unknown => "unknown",
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(MonitorStatus::Unknown),
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            other => Err(ValidationError(format!("unknown monitor status: {other}"))),
        }
    }
}

/// Outcome classification of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Up => "up",
            ProbeStatus::Down => "down",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(ProbeStatus::Up),
            "down" => Ok(ProbeStatus::Down),
            other => Err(ValidationError(format!("unknown probe status: {other}"))),
        }
    }
}

impl From<ProbeStatus> for MonitorStatus {
    fn from(value: ProbeStatus) -> Self {
        match value {
            ProbeStatus::Up => MonitorStatus::Up,
            ProbeStatus::Down => MonitorStatus::Down,
        }
    }
}

/// A monitored endpoint together with its cached current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,

    /// Target URL (unique across all monitors)
    pub url: String,
    pub method: HttpMethod,

    /// Check interval in seconds (>= 1)
    pub interval: u64,

    /// Per-probe timeout in seconds
    pub timeout: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // === Cached fields, written only by the result sink ===
    pub current_status: MonitorStatus,
    pub current_status_code: u16,

    /// Response time of the latest probe in milliseconds
    pub current_response: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    pub uptime_percentage: f64,
}

/// The immutable recorded outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub monitor_id: MonitorId,

    /// Snapshot of the target URL at probe time
    pub url: String,
    pub status: ProbeStatus,

    /// HTTP status code, 0 if no response was received
    pub status_code: u16,

    /// Response time in milliseconds
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Values applied to fields a creation request leaves out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorDefaults {
    pub method: HttpMethod,
    pub interval: u64,
    pub timeout: u64,
}

impl Default for MonitorDefaults {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            interval: 30,
            timeout: 10,
        }
    }
}

/// Request to create a new monitor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMonitorRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CreateMonitorRequest {
    /// Validate the request and turn it into a fresh monitor
    pub fn into_monitor(self, defaults: &MonitorDefaults) -> Result<Monitor, ValidationError> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return Err(ValidationError("url is required".to_string()));
        }

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| ValidationError(format!("invalid url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError(format!(
                "unsupported url scheme '{}', expected http or https",
                parsed.scheme()
            )));
        }

        let interval = self.interval.unwrap_or(defaults.interval);
        if interval == 0 {
            return Err(ValidationError("interval must be at least 1 second".to_string()));
        }

        let timeout = self.timeout.unwrap_or(defaults.timeout);
        if timeout == 0 {
            return Err(ValidationError("timeout must be at least 1 second".to_string()));
        }

        if timeout >= interval {
            warn!("timeout ({timeout}s) for {url} is not below its interval ({interval}s)");
        }

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| url.clone());

        let now = Utc::now();

        Ok(Monitor {
            id: Uuid::new_v4(),
            name,
            url,
            method: self.method.unwrap_or(defaults.method),
            interval,
            timeout,
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            current_status: MonitorStatus::Unknown,
            current_status_code: 0,
            current_response: 0,
            last_checked: None,
            uptime_percentage: 100.0,
        })
    }
}

/// A creation request was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.0)
    }
}

impl std::error::Error for ValidationError {}
