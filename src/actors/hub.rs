//! BroadcastHub - Fans update events out to connected observers
//!
//! The hub is the single owner of the observer set. Register, unregister and
//! broadcast are serialized through one bounded command queue and executed on
//! the hub's own task, so no other component ever reads or writes the set.
//!
//! ## Delivery
//!
//! - Publishing never waits: a full hub queue drops the event with a warning.
//! - Fan-out never waits: an observer whose queue is full (or closed) is
//!   evicted, and every other observer still receives the event.
//!
//! ```text
//! ResultSink --publish--> [command queue] --> BroadcastHub --try_send--> Observer-1 queue
//!                                              (one task)  --try_send--> Observer-N queue
//! ```

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::messages::{HubCommand, ObserverId, UpdateEvent};

/// Actor owning the observer set
pub struct BroadcastHub {
    observers: HashMap<ObserverId, mpsc::Sender<UpdateEvent>>,

    command_rx: mpsc::Receiver<HubCommand>,

    shutdown: CancellationToken,
}

impl BroadcastHub {
    pub fn new(command_rx: mpsc::Receiver<HubCommand>, shutdown: CancellationToken) -> Self {
        Self {
            observers: HashMap::new(),
            command_rx,
            shutdown,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until the shutdown token is cancelled or every handle is
    /// dropped. Remaining observer queues are closed on exit.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("broadcast hub started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    debug!("received shutdown signal");
                    break;
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        debug!("command channel closed, shutting down");
                        break;
                    }
                },
            }
        }

        let remaining = self.observers.len();
        self.observers.clear();
        info!("broadcast hub stopped ({} observers closed)", remaining);
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register { id, sender } => self.register(id, sender),
            HubCommand::Unregister { id } => self.unregister(id),
            HubCommand::Broadcast(event) => self.broadcast(event),
            HubCommand::ObserverCount { respond_to } => {
                let _ = respond_to.send(self.observers.len());
            }
        }
    }

    fn register(&mut self, id: ObserverId, sender: mpsc::Sender<UpdateEvent>) {
        if sender
            .try_send(UpdateEvent::connection_established(id))
            .is_err()
        {
            warn!("observer {} could not take its greeting, evicting", id);
            return;
        }

        self.observers.insert(id, sender);
        info!("observer connected: {} (total: {})", id, self.observers.len());
    }

    fn unregister(&mut self, id: ObserverId) {
        // dropping the sender closes the observer's queue
        if self.observers.remove(&id).is_some() {
            info!(
                "observer disconnected: {} (total: {})",
                id,
                self.observers.len()
            );
        }
    }

    fn broadcast(&mut self, event: UpdateEvent) {
        let mut evicted = Vec::new();

        for (id, sender) in &self.observers {
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("observer {} queue is full, evicting", id);
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("observer {} queue closed, evicting", id);
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            self.unregister(id);
        }

        debug!(
            "broadcast {} to {} observers",
            event.kind(),
            self.observers.len()
        );
    }
}

/// Handle for talking to the BroadcastHub
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Spawn a new hub with a command queue of `buffer` slots
    pub fn spawn(buffer: usize, shutdown: CancellationToken) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer.max(1));

        let actor = BroadcastHub::new(cmd_rx, shutdown);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Enqueue an event for fan-out without waiting
    ///
    /// Returns `false` when the event was dropped.
    pub fn publish(&self, event: UpdateEvent) -> bool {
        match self.sender.try_send(HubCommand::Broadcast(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("hub queue is saturated, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("hub stopped, dropping event");
                false
            }
        }
    }

    /// Register an observer queue
    ///
    /// Returns `false` if the hub has stopped.
    pub async fn register(&self, id: ObserverId, sender: mpsc::Sender<UpdateEvent>) -> bool {
        self.sender
            .send(HubCommand::Register { id, sender })
            .await
            .is_ok()
    }

    /// Create a queue of `buffer` slots and register it as a new observer
    pub async fn subscribe(&self, buffer: usize) -> (ObserverId, mpsc::Receiver<UpdateEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.register(id, tx).await;
        (id, rx)
    }

    /// Remove an observer (idempotent)
    pub async fn unregister(&self, id: ObserverId) {
        let _ = self.sender.send(HubCommand::Unregister { id }).await;
    }

    /// Number of registered observers (0 once the hub has stopped)
    pub async fn observer_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(HubCommand::ObserverCount { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
