//! API shared state

use crate::actors::HubHandle;
use crate::config::WebSocketConfig;
use crate::service::MonitorService;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Monitor lifecycle operations (storage + job registry)
    pub service: MonitorService,

    /// Handle to the broadcast hub for observer sessions
    pub hub: HubHandle,

    /// Observer session timing and buffer sizes
    pub websocket: WebSocketConfig,
}

impl ApiState {
    pub fn new(service: MonitorService, hub: HubHandle, websocket: WebSocketConfig) -> Self {
        Self {
            service,
            hub,
            websocket,
        }
    }
}
