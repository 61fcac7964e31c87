// Deterministic fixtures shared by use-case tests.

use super::simulation::{Simulation, SimulationConfig};
use super::types::WorldCommand;
use crate::domain::entities::{EntityId, InputCommand, InputState, Player};
use crate::domain::events::{EventSink, WorldEvent};
use crate::domain::match_rules::MatchRules;
use crate::domain::math::Vec2;
use crate::domain::ports::Clock;
use crate::domain::rng::GameRng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock")
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorldEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<WorldEvent> {
        std::mem::take(&mut *self.events.lock().expect("sink lock"))
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: WorldEvent) {
        self.events.lock().expect("sink lock").push(event);
    }
}

pub fn input(sequence: u64, state: InputState) -> InputCommand {
    InputCommand {
        sequence,
        state,
        client_timestamp: 0,
    }
}

pub struct TestRig {
    pub sim: Simulation,
    pub sink: Arc<RecordingSink>,
    pub now: Instant,
}

impl TestRig {
    pub fn new() -> Self {
        Self::with_rules(MatchRules::default())
    }

    pub fn with_rules(rules: MatchRules) -> Self {
        let now = Instant::now();
        let sink = Arc::new(RecordingSink::default());
        let config = SimulationConfig {
            rules,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config, Arc::new(GameRng::seeded(7)), sink.clone());
        Self { sim, sink, now }
    }

    /// Joins a player at `position` with spawn protection already worn off.
    pub fn place_player(&mut self, position: Vec2) -> EntityId {
        let id = self.sim.add_player(self.now);
        self.sim.events.clear();
        let player = self.player_mut(id);
        player.position = position;
        player.invulnerable = false;
        player.invulnerable_until = None;
        self.sim.history.clear(id);
        self.sim.history.record(id, position, self.now);
        id
    }

    pub fn player_mut(&mut self, id: EntityId) -> &mut Player {
        self.sim.world.player_mut(id).expect("player exists")
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    pub fn step(&mut self, dt: f32) {
        self.sim.step(self.now, dt, Vec::new());
    }

    pub fn step_with(&mut self, commands: Vec<WorldCommand>) {
        self.sim.step(self.now, 0.0, commands);
    }
}
