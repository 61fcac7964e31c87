// Event sink adapter: forwards simulation events onto the world's broadcast channel.

use crate::domain::events::{EventSink, WorldEvent};
use tokio::sync::broadcast;
use tracing::trace;

pub struct BroadcastSink {
    events: broadcast::Sender<WorldEvent>,
}

impl BroadcastSink {
    pub fn new(events: broadcast::Sender<WorldEvent>) -> Self {
        Self { events }
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: WorldEvent) {
        // No receivers simply means nobody is listening yet.
        if self.events.send(event).is_err() {
            trace!("event published with no subscribers");
        }
    }
}
