//! Session event bus
//!
//! Central hub for session events. Every event is logged; subscribers get
//! a copy if any are listening.

use tokio::sync::broadcast;

use super::events::SessionEvent;

const EVENT_CAPACITY: usize = 64;

/// Event bus for session events
pub struct SessionEventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Emit an event (logged via tracing, then broadcast)
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!("Session event: {:?}", event);
        // No receivers is the normal case
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new()
    }
}
