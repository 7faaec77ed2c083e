//! Message types for actor communication
//!
//! This module defines the frames exchanged with observers and the commands
//! accepted by the broadcast hub.
//!
//! ## Design Principles
//!
//! 1. **Commands**: Control messages sent to the hub via its single mpsc queue
//! 2. **Events**: Typed envelopes fanned out to every observer
//! 3. **Immutability**: All events are cloneable for multi-subscriber patterns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{MonitorId, MonitorStatus};

/// Unique identity of a connected observer
pub type ObserverId = Uuid;

/// Fresh status snapshot produced for every recorded probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorUpdate {
    pub monitor_id: MonitorId,
    pub status: MonitorStatus,
    pub status_code: u16,

    /// Response time in milliseconds
    pub response_time: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub uptime_percentage: f64,
}

/// Payload of the greeting sent to a freshly registered observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub status: String,
    pub message: String,
    pub observer_id: ObserverId,
}

/// Payload of a reply to an observer's ping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongInfo {
    pub timestamp: DateTime<Utc>,
    pub observer_id: ObserverId,
}

/// Typed envelope written to observers as a JSON text frame
///
/// ```json
/// {"type": "metric_update", "monitor_id": "...", "data": {"status": "up", ...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    MetricUpdate {
        monitor_id: MonitorId,
        data: MonitorUpdate,
    },
    ConnectionEstablished {
        data: ConnectionInfo,
    },
    Pong {
        data: PongInfo,
    },
}

impl UpdateEvent {
    pub fn metric_update(update: MonitorUpdate) -> Self {
        UpdateEvent::MetricUpdate {
            monitor_id: update.monitor_id,
            data: update,
        }
    }

    pub fn connection_established(observer_id: ObserverId) -> Self {
        UpdateEvent::ConnectionEstablished {
            data: ConnectionInfo {
                status: "connected".to_string(),
                message: "Real-time monitoring connected".to_string(),
                observer_id,
            },
        }
    }

    pub fn pong(observer_id: ObserverId) -> Self {
        UpdateEvent::Pong {
            data: PongInfo {
                timestamp: Utc::now(),
                observer_id,
            },
        }
    }

    /// The envelope's `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateEvent::MetricUpdate { .. } => "metric_update",
            UpdateEvent::ConnectionEstablished { .. } => "connection_established",
            UpdateEvent::Pong { .. } => "pong",
        }
    }
}

/// Control frame received from an observer
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Ping,

    /// Accepted and logged; no per-monitor filtering is applied
    SubscribeMonitor { monitor_id: Option<String> },

    /// Any other `type` tag
    Unknown(String),
}

impl ControlMessage {
    /// Parse an inbound text frame
    ///
    /// Returns `None` when the frame is not a JSON object with a string `type`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        let kind = value.get("type")?.as_str()?;

        Some(match kind {
            "ping" => ControlMessage::Ping,
            "subscribe_monitor" => ControlMessage::SubscribeMonitor {
                monitor_id: value
                    .get("monitor_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            },
            other => ControlMessage::Unknown(other.to_string()),
        })
    }
}

/// Commands that can be sent to the BroadcastHub
///
/// The hub processes these strictly in order on its own task; nothing else
/// touches the observer set.
#[derive(Debug)]
pub enum HubCommand {
    /// Add an observer and greet it
    Register {
        id: ObserverId,
        sender: mpsc::Sender<UpdateEvent>,
    },

    /// Remove an observer and close its queue (no-op if absent)
    Unregister { id: ObserverId },

    /// Fan an event out to every registered observer
    Broadcast(UpdateEvent),

    /// Report the number of registered observers
    ObserverCount { respond_to: oneshot::Sender<usize> },
}
