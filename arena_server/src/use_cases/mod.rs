// Use cases layer: world simulation, scheduling and state synchronization.

pub mod actions;
pub mod hub;
pub mod reconciliation;
pub mod scheduler;
pub mod simulation;
pub mod sync;
pub mod types;
pub mod world_registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use simulation::{Simulation, SimulationConfig};
pub use sync::{SyncMessage, SyncSettings};
pub use types::{ActionRequest, DeliveryError, HubControl, Outbox, Outgoing, SharedWorld, WorldCommand};
pub use world_registry::{RegistryError, WorldError, WorldHandle, WorldRegistry, WorldSettings, WorldStatus};
