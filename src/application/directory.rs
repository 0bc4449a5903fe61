//! Outbound queues for live connections.
//!
//! Every connection gets its own bounded channel. Fanout only ever does a
//! non-blocking `try_send`, so one slow client cannot hold up a room or
//! other clients; its events are dropped once its queue is full.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::ConnectionId;

use super::events::HubEvent;

/// Result of queueing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full; event dropped for this connection only.
    Lagging,
    /// Connection unknown or its receiver is gone.
    Gone,
}

/// Registry of live connections and their outbound queues.
#[derive(Debug)]
pub struct ConnectionDirectory {
    outboxes: RwLock<HashMap<ConnectionId, mpsc::Sender<HubEvent>>>,
    buffer: usize,
}

impl ConnectionDirectory {
    pub fn new(buffer: usize) -> Self {
        Self {
            outboxes: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Registers a new connection and returns the receiving end of its queue.
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<HubEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.outboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id, tx);
        rx
    }

    /// Forgets a connection. Returns false if it was not registered.
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        self.outboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id)
            .is_some()
    }

    /// True if registered and its receiver is still open.
    pub fn is_live(&self, connection_id: &ConnectionId) -> bool {
        self.outboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(connection_id)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Queues an event without waiting.
    pub fn deliver(&self, connection_id: &ConnectionId, event: HubEvent) -> Delivery {
        let outboxes = self.outboxes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = outboxes.get(connection_id) else {
            return Delivery::Gone;
        };

        match tx.try_send(event) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    event = event.kind(),
                    "Outbound queue full, dropping event"
                );
                Delivery::Lagging
            }
            Err(TrySendError::Closed(_)) => Delivery::Gone,
        }
    }

    pub fn len(&self) -> usize {
        self.outboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn pong() -> HubEvent {
        HubEvent::Pong {
            timestamp: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn registered_connection_receives_events() {
        let directory = ConnectionDirectory::new(8);
        let id = ConnectionId::new();
        let mut rx = directory.register(id);

        assert_eq!(directory.deliver(&id, pong()), Delivery::Queued);
        assert!(matches!(rx.recv().await, Some(HubEvent::Pong { .. })));
    }

    #[test]
    fn unknown_connection_is_gone() {
        let directory = ConnectionDirectory::new(8);
        assert_eq!(directory.deliver(&ConnectionId::new(), pong()), Delivery::Gone);
    }

    #[test]
    fn dropped_receiver_marks_connection_dead() {
        let directory = ConnectionDirectory::new(8);
        let id = ConnectionId::new();
        let rx = directory.register(id);
        assert!(directory.is_live(&id));

        drop(rx);
        assert!(!directory.is_live(&id));
        assert_eq!(directory.deliver(&id, pong()), Delivery::Gone);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let directory = ConnectionDirectory::new(1);
        let id = ConnectionId::new();
        let _rx = directory.register(id);

        assert_eq!(directory.deliver(&id, pong()), Delivery::Queued);
        assert_eq!(directory.deliver(&id, pong()), Delivery::Lagging);
        assert!(directory.is_live(&id));
    }

    #[test]
    fn unregister_removes_connection() {
        let directory = ConnectionDirectory::new(8);
        let id = ConnectionId::new();
        let _rx = directory.register(id);

        assert!(directory.unregister(&id));
        assert!(!directory.unregister(&id));
        assert!(directory.is_empty());
    }
}
