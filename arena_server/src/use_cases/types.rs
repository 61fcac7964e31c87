// Use-case level inputs/outputs crossing task boundaries.

use super::simulation::Simulation;
use super::sync::SyncMessage;
use crate::domain::{EntityId, InputCommand, WorldEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, oneshot};

/// The authoritative world. The tick scheduler is its only writer.
pub type SharedWorld = Arc<RwLock<Simulation>>;

/// Gameplay requests carrying only what the server cannot infer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionRequest {
    Fire { aim_angle: f32, client_timestamp: u64 },
    Melee { aim_angle: f32 },
    Roll,
    Reload,
    Pickup { crate_id: EntityId },
}

/// Everything a connection may ask of its world. Applied during the input phase.
#[derive(Debug)]
pub enum WorldCommand {
    Join { reply: oneshot::Sender<EntityId> },
    Leave { entity: EntityId },
    Input { entity: EntityId, command: InputCommand },
    Action { entity: EntityId, action: ActionRequest },
    ReportRtt { entity: EntityId, rtt: Duration },
}

/// Items the synchronizer hands to a connection's outbound path.
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    Sync(&'a SyncMessage),
    Event(&'a WorldEvent),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Queue at capacity; the item was dropped.
    Full,
    /// Receiving side is gone; the connection is finished.
    Closed,
}

// Port for a connection's bounded outbound queue.
pub trait Outbox: Send {
    fn deliver(&mut self, item: Outgoing<'_>) -> Result<(), DeliveryError>;
}

pub enum HubControl {
    Register {
        conn_id: u64,
        entity: EntityId,
        outbox: Box<dyn Outbox>,
    },
    Unregister {
        conn_id: u64,
    },
}
