//! Event sinks.
//!
//! The registry hands every event to an [`EventSink`] after the mutation
//! that produced it has been committed. Failed calls never emit.

use std::sync::{Arc, Mutex, PoisonError};

use timelock_core::RegistryEvent;
use tokio::sync::broadcast;

/// Default capacity of a [`BroadcastSink`] channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Receives registry events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not block.
    fn emit(&self, event: RegistryEvent);
}

impl<E: EventSink + ?Sized> EventSink for Arc<E> {
    fn emit(&self, event: RegistryEvent) {
        (**self).emit(event)
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: RegistryEvent) {}
}

/// Append-only in-memory log of every event.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RegistryEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far, in emission order.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events logged.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was logged yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: RegistryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Fans events out to live subscribers over a tokio broadcast channel.
///
/// Subscribers only see events emitted after they subscribed. A slow
/// subscriber that falls more than the channel capacity behind gets
/// `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<RegistryEvent>,
}

impl BroadcastSink {
    /// Create a sink with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a sink with the given channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: RegistryEvent) {
        // Sending with no subscribers is fine.
        if self.sender.send(event).is_err() {
            tracing::trace!("registry event dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_core::{Address, RecordId};

    fn allowed(id: u64) -> RegistryEvent {
        RegistryEvent::DecryptionAllowed {
            id: RecordId::new(id),
            recipient: Address::from_bytes([2; 20]),
        }
    }

    #[test]
    fn test_event_log_keeps_order() {
        let log = EventLog::new();
        assert!(log.is_empty());

        log.emit(allowed(0));
        log.emit(allowed(1));

        assert_eq!(log.events(), vec![allowed(0), allowed(1)]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let sink = BroadcastSink::with_capacity(4);
        assert_eq!(sink.subscriber_count(), 0);
        sink.emit(allowed(0));
    }

    #[test]
    fn test_broadcast_delivers() {
        let sink = BroadcastSink::new();
        let mut rx = sink.subscribe();

        sink.emit(allowed(7));

        assert_eq!(rx.try_recv().ok(), Some(allowed(7)));
    }

    #[test]
    fn test_shared_sink() {
        let log = Arc::new(EventLog::new());
        let sink: Arc<dyn EventSink> = log.clone();

        sink.emit(allowed(1));

        assert_eq!(log.len(), 1);
    }
}
