//! Client event bus

use agrilink_domain::ClientEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per subscriber before lagging ones start dropping
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

pub fn channel() -> broadcast::Sender<ClientEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Publish without caring whether anyone listens.
pub fn publish(events: &broadcast::Sender<ClientEvent>, event: ClientEvent) {
    if events.send(event).is_err() {
        debug!("client event dropped; no subscribers");
    }
}
