//! Per-session SSE fan-out.
//!
//! Listeners subscribe with a bounded queue each. Publishing delivers to a
//! snapshot of the set; a listener whose enqueue fails (gone, or hopelessly
//! behind) is evicted. Each listener observes events in publish order; there
//! is no ordering guarantee between listeners.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use viva_domain::enums::SseEventType;
use viva_domain::events::TaskEvent;

const LISTENER_CAPACITY: usize = 32;

/// The wire envelope: `{event_type, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct SseEnvelope {
    pub event_type: SseEventType,
    pub data: TaskEvent,
}

#[derive(Default)]
pub struct SseBus {
    listeners: Mutex<Vec<mpsc::Sender<SseEnvelope>>>,
}

impl SseBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its event stream.
    pub fn subscribe(&self) -> mpsc::Receiver<SseEnvelope> {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        self.listeners.lock().push(tx);
        rx
    }

    /// Deliver an event to every current listener, evicting the broken ones.
    pub fn publish(&self, event_type: SseEventType, data: TaskEvent) {
        let snapshot: Vec<mpsc::Sender<SseEnvelope>> = self.listeners.lock().clone();
        let mut dead = Vec::new();

        for (i, listener) in snapshot.iter().enumerate() {
            let envelope = SseEnvelope {
                event_type,
                data: data.clone(),
            };
            if let Err(e) = listener.try_send(envelope) {
                tracing::warn!(error = %e, "SSE listener enqueue failed, evicting");
                dead.push(i);
            }
        }

        if !dead.is_empty() {
            let dead_senders: Vec<_> = dead.iter().map(|&i| snapshot[i].clone()).collect();
            self.listeners
                .lock()
                .retain(|l| !dead_senders.iter().any(|d| d.same_channel(l)));
        }

        tracing::debug!(
            event_type = ?event_type,
            listeners = self.listener_count(),
            "published SSE event"
        );
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listeners_receive_events_in_publish_order() {
        let bus = SseBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SseEventType::Interview, TaskEvent::wrap_up());
        bus.publish(SseEventType::System, TaskEvent::wrap_up());

        assert!(matches!(rx.recv().await.unwrap().event_type, SseEventType::Interview));
        assert!(matches!(rx.recv().await.unwrap().event_type, SseEventType::System));
    }

    #[tokio::test]
    async fn dropped_listener_is_evicted_on_publish() {
        let bus = SseBus::new();
        let rx = bus.subscribe();
        let _live = bus.subscribe();
        assert_eq!(bus.listener_count(), 2);

        drop(rx);
        bus.publish(SseEventType::System, TaskEvent::wrap_up());
        assert_eq!(bus.listener_count(), 1);
    }

    #[tokio::test]
    async fn publish_with_no_listeners_is_fine() {
        let bus = SseBus::new();
        bus.publish(SseEventType::Interview, TaskEvent::wrap_up());
        assert_eq!(bus.listener_count(), 0);
    }
}
