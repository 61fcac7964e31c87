// World orchestration: spawning worlds and handing connections their channels.

use super::hub::{HubSettings, run_hub};
use super::scheduler::{SchedulerSettings, run_world};
use super::simulation::{Simulation, SimulationConfig};
use super::types::{HubControl, Outbox, SharedWorld, WorldCommand};
use crate::domain::entities::EntityId;
use crate::domain::events::{EventSink, WorldEvent};
use crate::domain::ports::Clock;
use crate::domain::rng::GameRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Builds the event sink a world publishes into, given its broadcast sender.
pub type SinkFactory = Arc<dyn Fn(broadcast::Sender<WorldEvent>) -> Arc<dyn EventSink> + Send + Sync>;

/// Shared configuration for spawning worlds.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub simulation: SimulationConfig,
    pub scheduler: SchedulerSettings,
    pub hub: HubSettings,
    /// Capacity for inbound connection commands.
    pub command_capacity: usize,
    /// Capacity for the per-world gameplay event broadcast.
    pub event_capacity: usize,
    /// Capacity for hub register/unregister messages.
    pub control_capacity: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            scheduler: SchedulerSettings::default(),
            hub: HubSettings::default(),
            command_capacity: 1024,
            event_capacity: 256,
            control_capacity: 64,
        }
    }
}

/// Errors returned by registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// World already exists and cannot be re-created.
    AlreadyExists,
    /// World ids must be non-empty and free of whitespace.
    InvalidId,
}

/// Errors returned when talking to a running world.
#[derive(Debug, PartialEq, Eq)]
pub enum WorldError {
    /// The world's tasks have stopped.
    Closed,
    /// The command queue is at capacity; the command was dropped.
    Busy,
}

/// Diagnostics view of one world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldStatus {
    pub world_id: String,
    pub tick: u64,
    pub players: usize,
    pub projectiles: usize,
    pub match_over: bool,
}

/// Per-world channels handed to connections.
#[derive(Clone)]
pub struct WorldHandle {
    /// Identifier clients use to target this world.
    pub world_id: Arc<str>,
    /// Sender for commands into the tick scheduler.
    commands: mpsc::Sender<WorldCommand>,
    /// Read access for diagnostics.
    world: SharedWorld,
    /// Sender for hub registration.
    hub: mpsc::Sender<HubControl>,
}

impl WorldHandle {
    /// Asks the world for a player entity and waits for the id.
    pub async fn join(&self) -> Result<EntityId, WorldError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(WorldCommand::Join { reply })
            .await
            .map_err(|_| WorldError::Closed)?;
        rx.await.map_err(|_| WorldError::Closed)
    }

    /// Awaited so a removal is never dropped on a full queue.
    pub async fn leave(&self, entity: EntityId) -> Result<(), WorldError> {
        self.commands
            .send(WorldCommand::Leave { entity })
            .await
            .map_err(|_| WorldError::Closed)
    }

    /// Non-blocking send for high-rate traffic (inputs, actions, RTT reports).
    pub fn try_command(&self, command: WorldCommand) -> Result<(), WorldError> {
        self.commands.try_send(command).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => WorldError::Busy,
            mpsc::error::TrySendError::Closed(_) => WorldError::Closed,
        })
    }

    pub async fn register(
        &self,
        conn_id: u64,
        entity: EntityId,
        outbox: Box<dyn Outbox>,
    ) -> Result<(), WorldError> {
        self.hub
            .send(HubControl::Register {
                conn_id,
                entity,
                outbox,
            })
            .await
            .map_err(|_| WorldError::Closed)
    }

    pub async fn unregister(&self, conn_id: u64) {
        // A stopped hub has nothing left to unregister from.
        let _ = self.hub.send(HubControl::Unregister { conn_id }).await;
    }

    pub async fn status(&self) -> WorldStatus {
        let sim = self.world.read().await;
        WorldStatus {
            world_id: self.world_id.to_string(),
            tick: sim.tick(),
            players: sim.world().player_count(),
            projectiles: sim.world().projectile_count(),
            match_over: sim.is_match_over(),
        }
    }
}

/// Thread-safe registry for running worlds.
pub struct WorldRegistry {
    /// Settings applied to newly created worlds.
    settings: WorldSettings,
    clock: Arc<dyn Clock>,
    sink_factory: SinkFactory,
    /// Shared shutdown flag observed by every world's tasks.
    shutdown: watch::Receiver<bool>,
    /// Map of world id to active handle.
    worlds: RwLock<HashMap<String, WorldHandle>>,
    /// Scheduler and hub tasks, awaited on shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WorldRegistry {
    pub fn new(
        settings: WorldSettings,
        clock: Arc<dyn Clock>,
        sink_factory: SinkFactory,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            settings,
            clock,
            sink_factory,
            shutdown,
            worlds: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new world and spawns its scheduler and sync hub.
    pub async fn create_world(&self, world_id: &str) -> Result<WorldHandle, RegistryError> {
        let world_id = world_id.trim();
        if world_id.is_empty() || world_id.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidId);
        }
        let mut worlds = self.worlds.write().await;
        if worlds.contains_key(world_id) {
            return Err(RegistryError::AlreadyExists);
        }

        let (commands, commands_rx) = mpsc::channel(self.settings.command_capacity);
        let (events, events_rx) = broadcast::channel(self.settings.event_capacity);
        let (hub, hub_rx) = mpsc::channel(self.settings.control_capacity);

        let sink = (self.sink_factory)(events);
        let sim = Simulation::new(
            self.settings.simulation.clone(),
            Arc::new(GameRng::from_os_entropy()),
            sink,
        );
        let world: SharedWorld = Arc::new(RwLock::new(sim));
        let id: Arc<str> = Arc::from(world_id);

        let scheduler = tokio::spawn(run_world(
            id.clone(),
            world.clone(),
            commands_rx,
            self.clock.clone(),
            self.settings.scheduler.clone(),
            self.shutdown.clone(),
        ));
        let sync = tokio::spawn(run_hub(
            id.clone(),
            world.clone(),
            hub_rx,
            events_rx,
            self.clock.clone(),
            self.settings.hub,
            self.shutdown.clone(),
        ));
        self.tasks.lock().await.extend([scheduler, sync]);

        let handle = WorldHandle {
            world_id: id,
            commands,
            world,
            hub,
        };
        worlds.insert(world_id.to_string(), handle.clone());
        info!(world_id, "world created");
        Ok(handle)
    }

    /// Returns a world handle for the provided id, if it exists.
    pub async fn get_world(&self, world_id: &str) -> Option<WorldHandle> {
        self.worlds.read().await.get(world_id).cloned()
    }

    pub async fn world_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.worlds.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Waits for every world task to finish after shutdown was signalled.
    pub async fn wait_stopped(&self, grace: Duration) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        let joined = tokio::time::timeout(grace, futures::future::join_all(tasks)).await;
        match joined {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        warn!(error = %err, "world task ended abnormally");
                    }
                }
            }
            Err(_) => warn!(grace_ms = grace.as_millis() as u64, "world tasks still running after grace period"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::SystemClock;

    struct NullSink;

    impl EventSink for NullSink {
        fn publish(&self, _event: WorldEvent) {}
    }

    fn registry() -> (WorldRegistry, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let factory: SinkFactory = Arc::new(|_events| Arc::new(NullSink) as Arc<dyn EventSink>);
        let registry = WorldRegistry::new(WorldSettings::default(), Arc::new(SystemClock), factory, shutdown_rx);
        (registry, shutdown_tx)
    }

    #[tokio::test]
    async fn duplicate_and_invalid_ids_are_rejected() {
        let (registry, _shutdown) = registry();
        registry.create_world("alpha").await.expect("created");
        assert_eq!(registry.create_world("alpha").await.err(), Some(RegistryError::AlreadyExists));
        assert_eq!(registry.create_world("  ").await.err(), Some(RegistryError::InvalidId));
        assert_eq!(registry.create_world("a b").await.err(), Some(RegistryError::InvalidId));
        assert_eq!(registry.world_ids().await, vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn join_and_leave_round_trip_through_the_scheduler() {
        let (registry, shutdown) = registry();
        let handle = registry.create_world("arena").await.expect("created");
        let entity = handle.join().await.expect("joined");
        assert_eq!(handle.status().await.players, 1);

        handle.leave(entity).await.expect("sent");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while handle.status().await.players != 0 {
            assert!(tokio::time::Instant::now() < deadline, "leave never applied");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown.send(true).expect("tasks listening");
        registry.wait_stopped(Duration::from_secs(2)).await;
        assert_eq!(handle.join().await, Err(WorldError::Closed));
    }
}
