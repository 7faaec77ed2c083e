//! Probe executor - one bounded HTTP request per call
//!
//! The executor owns a single pooled `reqwest::Client` shared by every
//! monitor. Each probe is classified into [`ProbeOutcome`]; nothing on this
//! path returns an error to the caller.
//!
//! ## Classification
//!
//! | Result                         | status | code   | error          |
//! |--------------------------------|--------|--------|----------------|
//! | transport failure              | down   | 0      | transport text |
//! | HTTP status >= 400             | down   | actual | none           |
//! | any other HTTP status          | up     | actual | none           |

use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::{Monitor, ProbeStatus};

const USER_AGENT: &str = concat!("pulsewatch/", env!("CARGO_PKG_VERSION"));

/// Idle keep-alive connections kept per target host
const POOL_MAX_IDLE_PER_HOST: usize = 10;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,

    /// HTTP status code, 0 when no response was received
    pub status_code: u16,

    /// Wall-clock time around the request in milliseconds
    pub response_time_ms: u64,

    /// Transport error text, if the request failed before a response
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// Classify a received HTTP status code
    pub fn from_status_code(status_code: u16, response_time_ms: u64) -> Self {
        let status = if status_code >= 400 {
            ProbeStatus::Down
        } else {
            ProbeStatus::Up
        };

        Self {
            status,
            status_code,
            response_time_ms,
            error: None,
        }
    }

    /// Classify a transport-level failure
    pub fn from_transport_error(error: impl ToString, response_time_ms: u64) -> Self {
        Self {
            status: ProbeStatus::Down,
            status_code: 0,
            response_time_ms,
            error: Some(error.to_string()),
        }
    }
}

/// Performs HTTP probes over a shared connection pool
#[derive(Debug, Clone)]
pub struct ProbeExecutor {
    client: reqwest::Client,
}

impl ProbeExecutor {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Probe the monitor's target once, bounded by its timeout
    #[instrument(skip(self, monitor), fields(monitor_id = %monitor.id, url = %monitor.url))]
    pub async fn execute(&self, monitor: &Monitor) -> ProbeOutcome {
        let start = Instant::now();

        let result = self
            .client
            .request(monitor.method.into(), &monitor.url)
            .timeout(Duration::from_secs(monitor.timeout))
            .send()
            .await;

        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            // the body is dropped unread
            Ok(response) => {
                let outcome = ProbeOutcome::from_status_code(response.status().as_u16(), elapsed);
                debug!(
                    "probe finished: {} {} in {}ms",
                    outcome.status, outcome.status_code, elapsed
                );
                outcome
            }
            Err(e) => {
                warn!("probe transport failure after {}ms: {}", elapsed, e);
                ProbeOutcome::from_transport_error(describe_error(&e), elapsed)
            }
        }
    }
}

/// Render a reqwest error including its source chain
fn describe_error(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
