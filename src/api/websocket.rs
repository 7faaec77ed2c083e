//! WebSocket endpoint and observer sessions
//!
//! Each connection becomes an observer registered with the broadcast hub and
//! runs two pumps:
//!
//! - **outbound**: drains the hub queue and a private reply queue, writes
//!   JSON text frames under a write deadline, and sends a Ping every
//!   keepalive period regardless of traffic
//! - **inbound**: reads control frames (`ping`, `subscribe_monitor`) until
//!   the peer closes, errors or goes silent past the read timeout. Pong
//!   replies to the keepalive count as activity, so a passive observer stays
//!   connected as long as its transport answers pings.
//!
//! When either pump ends the other is aborted and the observer is
//! unregistered.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior, timeout};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::actors::HubHandle;
use crate::actors::messages::{ControlMessage, ObserverId, UpdateEvent};
use crate::api::state::ApiState;
use crate::config::WebSocketConfig;

/// Pending pong replies per observer
const REPLY_BUFFER: usize = 8;

/// Timing and buffer settings of an observer session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub write_timeout: Duration,
    pub keepalive: Duration,
    pub read_timeout: Duration,
    pub buffer: usize,
}

impl From<&WebSocketConfig> for SessionConfig {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            write_timeout: config.write_timeout(),
            keepalive: config.keepalive(),
            read_timeout: config.read_timeout(),
            buffer: config.observer_buffer,
        }
    }
}

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    let config = SessionConfig::from(&state.websocket);
    ws.on_upgrade(move |socket| handle_websocket(socket, state.hub, config))
}

async fn handle_websocket(socket: WebSocket, hub: HubHandle, config: SessionConfig) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, hub, config).await;
}

/// Run one observer session over any message sink/stream pair
#[instrument(skip_all, fields(observer_id = tracing::field::Empty))]
pub async fn run_session<S, R, E>(sink: S, stream: R, hub: HubHandle, config: SessionConfig)
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let id = Uuid::new_v4();
    tracing::Span::current().record("observer_id", tracing::field::display(id));

    let (event_tx, event_rx) = mpsc::channel(config.buffer.max(1));
    if !hub.register(id, event_tx).await {
        warn!("hub is not running, refusing observer");
        return;
    }

    let (reply_tx, reply_rx) = mpsc::channel(REPLY_BUFFER);

    let mut send_task = tokio::spawn(outbound_pump(
        sink,
        event_rx,
        reply_rx,
        config.write_timeout,
        config.keepalive,
    ));
    let mut recv_task = tokio::spawn(inbound_pump(stream, id, reply_tx, config.read_timeout));

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    hub.unregister(id).await;
    info!("observer session ended");
}

/// Write hub events and replies to the transport
async fn outbound_pump<S>(
    mut sink: S,
    mut events: mpsc::Receiver<UpdateEvent>,
    mut replies: mpsc::Receiver<UpdateEvent>,
    write_timeout: Duration,
    keepalive: Duration,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut pings = time::interval_at(time::Instant::now() + keepalive, keepalive);
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => Some(event),
                None => {
                    debug!("observer queue closed, sending close frame");
                    let _ = timeout(write_timeout, sink.send(Message::Close(None))).await;
                    break;
                }
            },

            Some(reply) = replies.recv() => Some(reply),

            _ = pings.tick() => None,
        };

        let message = match event {
            Some(event) => match serde_json::to_string(&event) {
                Ok(text) => Message::Text(text),
                Err(e) => {
                    warn!("failed to encode {} event: {}", event.kind(), e);
                    continue;
                }
            },
            None => Message::Ping(Vec::new()),
        };

        match timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("write failed, observer disconnected: {}", e);
                break;
            }
            Err(_) => {
                warn!("write deadline of {:?} exceeded, dropping observer", write_timeout);
                break;
            }
        }
    }
}

/// Read control frames until the peer goes away
async fn inbound_pump<R, E>(
    mut stream: R,
    id: ObserverId,
    replies: mpsc::Sender<UpdateEvent>,
    read_timeout: Duration,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = match timeout(read_timeout, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                debug!("read failed: {}", e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                info!("observer silent for {:?}, closing", read_timeout);
                break;
            }
        };

        match frame {
            Message::Text(text) => handle_control(&text, id, &replies),
            Message::Close(_) => break,
            // pings and pongs are handled by the transport, but still count as activity
            _ => {}
        }
    }
}

fn handle_control(text: &str, id: ObserverId, replies: &mpsc::Sender<UpdateEvent>) {
    match ControlMessage::parse(text) {
        Some(ControlMessage::Ping) => {
            if replies.try_send(UpdateEvent::pong(id)).is_err() {
                debug!("reply queue full, dropping pong");
            }
        }
        Some(ControlMessage::SubscribeMonitor { monitor_id }) => {
            info!("observer subscribed to monitor updates ({:?})", monitor_id);
        }
        Some(ControlMessage::Unknown(kind)) => {
            warn!("unknown message type from observer: {}", kind);
        }
        None => {
            warn!("ignoring malformed frame from observer");
        }
    }
}
