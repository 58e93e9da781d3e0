use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::DomainEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for per-space domain events. Publishing happens inside the
/// owning space's lock scope, so subscribers receive one space's events in
/// emission order; ordering across spaces is not guaranteed.
pub struct EventHub {
    channels: DashMap<Ulid, broadcast::Sender<DomainEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a space. Creates the channel if needed.
    pub fn subscribe(&self, space_id: Ulid) -> broadcast::Receiver<DomainEvent> {
        let sender = self
            .channels
            .entry(space_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish an event to its space's channel. No-op if nobody listens.
    pub fn publish(&self, event: &DomainEvent) {
        if let Some(sender) = self.channels.get(&event.space_id()) {
            let _ = sender.send(event.clone());
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
