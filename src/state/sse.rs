use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Per-username SSE hubs. Every open `/api/events` response for a user is a
/// subscriber of that user's hub; hubs are created on first touch.
#[derive(Clone)]
pub struct SseRegistry {
    hubs: Arc<DashMap<String, SseHub>>,
    capacity: usize,
}

impl SseRegistry {
    /// Build the registry with a per-hub broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Register a new subscriber for `username`'s stream.
    pub fn subscribe(&self, username: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(username.to_string())
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Push an event to every open stream of `username`. A user with no open
    /// streams simply drops the event.
    pub fn broadcast(&self, username: &str, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(username) {
            hub.broadcast(event);
        }
    }
}

/// Simple broadcast hub wrapper feeding the SSE responses.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_every_subscriber_of_the_same_user() {
        let registry = SseRegistry::new(8);
        let mut first = registry.subscribe("alice");
        let mut second = registry.subscribe("alice");
        let mut other = registry.subscribe("bob");

        registry.broadcast("alice", ServerEvent::raw("{\"type\":\"CHAT\"}"));

        assert_eq!(first.recv().await.unwrap().data, "{\"type\":\"CHAT\"}");
        assert_eq!(second.recv().await.unwrap().data, "{\"type\":\"CHAT\"}");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let registry = SseRegistry::new(8);
        registry.broadcast("nobody", ServerEvent::raw("{}"));
    }
}
