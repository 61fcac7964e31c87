// Synchronizer task: state cadence plus event fan-out for every connection of one world.

use super::sync::{ConnectionSyncState, SnapshotPayload, SyncMessage, SyncSettings};
use super::types::{DeliveryError, HubControl, Outbox, Outgoing, SharedWorld};
use crate::domain::entities::EntityId;
use crate::domain::events::{Audience, WorldEvent};
use crate::domain::ports::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    pub sync_interval: Duration,
    pub sync: SyncSettings,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_millis(50),
            sync: SyncSettings::default(),
        }
    }
}

struct Subscriber {
    entity: EntityId,
    outbox: Box<dyn Outbox>,
    sync: ConnectionSyncState,
    dropped: u64,
}

impl Subscriber {
    /// Returns false once the connection is gone.
    fn deliver(&mut self, item: Outgoing<'_>) -> bool {
        match self.outbox.deliver(item) {
            Ok(()) => true,
            Err(DeliveryError::Full) => {
                self.dropped += 1;
                true
            }
            Err(DeliveryError::Closed) => false,
        }
    }

    fn wants(&self, event: &WorldEvent) -> bool {
        match event.audience() {
            Audience::All => true,
            Audience::Entity(id) => id == self.entity,
        }
    }
}

struct Hub {
    world_id: Arc<str>,
    world: SharedWorld,
    clock: Arc<dyn Clock>,
    settings: HubSettings,
    subscribers: BTreeMap<u64, Subscriber>,
}

impl Hub {
    async fn handle_control(&mut self, control: HubControl) {
        match control {
            HubControl::Register {
                conn_id,
                entity,
                outbox,
            } => {
                self.subscribers.insert(
                    conn_id,
                    Subscriber {
                        entity,
                        outbox,
                        sync: ConnectionSyncState::new(),
                        dropped: 0,
                    },
                );
                debug!(world_id = %self.world_id, conn_id, entity_id = entity, "subscriber registered");
                // First contact gets its snapshot without waiting for the next cycle.
                let view = self.world.read().await.view();
                let now = self.clock.now();
                if let Some(subscriber) = self.subscribers.get_mut(&conn_id)
                    && let Some(message) = subscriber.sync.plan(&view, now, &self.settings.sync)
                    && !sync_one(subscriber, &message, now)
                {
                    self.subscribers.remove(&conn_id);
                }
            }
            HubControl::Unregister { conn_id } => {
                if let Some(subscriber) = self.subscribers.remove(&conn_id) {
                    debug!(
                        world_id = %self.world_id,
                        conn_id,
                        entity_id = subscriber.entity,
                        dropped = subscriber.dropped,
                        "subscriber unregistered"
                    );
                }
            }
        }
    }

    async fn sync_cycle(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        // Clone under the read lock, diff and encode after it is released.
        let view = self.world.read().await.view();
        let now = self.clock.now();
        let settings = self.settings.sync;
        self.subscribers.retain(|_, subscriber| {
            match subscriber.sync.plan(&view, now, &settings) {
                Some(message) => sync_one(subscriber, &message, now),
                None => true,
            }
        });
    }

    fn fan_out(&mut self, event: &WorldEvent) {
        self.subscribers.retain(|_, subscriber| {
            !subscriber.wants(event) || subscriber.deliver(Outgoing::Event(event))
        });
    }

    /// Final snapshot and shutdown notice, then every outbox is dropped.
    async fn close(&mut self) {
        let view = self.world.read().await.view();
        let snapshot = SyncMessage::Snapshot(SnapshotPayload::from(&view));
        for (conn_id, mut subscriber) in std::mem::take(&mut self.subscribers) {
            if subscriber.deliver(Outgoing::Sync(&snapshot)) {
                subscriber.deliver(Outgoing::Shutdown);
            }
            debug!(world_id = %self.world_id, conn_id, "subscriber closed for shutdown");
        }
    }
}

/// Delivers one sync message and commits the baseline only when it was accepted.
fn sync_one(subscriber: &mut Subscriber, message: &SyncMessage, now: std::time::Instant) -> bool {
    match subscriber.outbox.deliver(Outgoing::Sync(message)) {
        Ok(()) => {
            subscriber.sync.commit(message, now);
            true
        }
        Err(DeliveryError::Full) => {
            subscriber.dropped += 1;
            true
        }
        Err(DeliveryError::Closed) => false,
    }
}

pub async fn run_hub(
    world_id: Arc<str>,
    world: SharedWorld,
    mut control: mpsc::Receiver<HubControl>,
    mut events: broadcast::Receiver<WorldEvent>,
    clock: Arc<dyn Clock>,
    settings: HubSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(settings.sync_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut hub = Hub {
        world_id,
        world,
        clock,
        settings,
        subscribers: BTreeMap::new(),
    };

    info!(world_id = %hub.world_id, "sync hub started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            message = control.recv() => {
                let Some(message) = message else {
                    break;
                };
                hub.handle_control(message).await;
            }
            event = events.recv() => match event {
                Ok(event) => hub.fan_out(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(world_id = %hub.world_id, skipped, "event fan-out lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = interval.tick() => hub.sync_cycle().await,
        }
    }

    hub.close().await;
    info!(world_id = %hub.world_id, "sync hub stopped");
}
