// Client-side counterparts of the sync contract: prediction replay, correction,
// replica maintenance and reconnect backoff.

use super::sync::{DeltaPayload, SnapshotPayload, SyncMessage};
use crate::domain::entities::{EntityId, InputCommand};
use crate::domain::math::Vec2;
use crate::domain::world::{PickupView, PlayerView, ProjectileView};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Locally applied commands awaiting server acknowledgement.
#[derive(Debug, Default)]
pub struct PredictionBuffer {
    pending: VecDeque<InputCommand>,
    capacity: usize,
}

impl PredictionBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, command: InputCommand) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(command);
    }

    /// Drops everything at or below `sequence` and returns what must be replayed.
    pub fn acknowledge(&mut self, sequence: u64) -> Vec<InputCommand> {
        while self.pending.front().is_some_and(|c| c.sequence <= sequence) {
            self.pending.pop_front();
        }
        self.pending.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Within tolerance; nothing to do.
    None,
    /// Move this fraction of the error per frame.
    Smooth { target: Vec2, step: Vec2 },
    Snap { target: Vec2 },
}

#[derive(Debug, Clone, Copy)]
pub struct CorrectionPolicy {
    /// Errors above this many pixels snap instead of converging.
    pub snap_threshold: f32,
    /// Errors below this are ignored.
    pub tolerance: f32,
    /// Fraction of the error corrected per frame while smoothing.
    pub smoothing: f32,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            snap_threshold: 100.0,
            tolerance: 0.1,
            smoothing: 0.2,
        }
    }
}

impl CorrectionPolicy {
    pub fn correct(&self, predicted: Vec2, authoritative: Vec2) -> Correction {
        let error = predicted.distance(authoritative);
        if error <= self.tolerance {
            Correction::None
        } else if error <= self.snap_threshold {
            Correction::Smooth {
                target: authoritative,
                step: (authoritative - predicted) * self.smoothing,
            }
        } else {
            Correction::Snap {
                target: authoritative,
            }
        }
    }
}

/// Exponential backoff for re-establishing a dropped session.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            attempts: 0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let delay = self.base_delay * 2u32.pow(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Client-side mirror rebuilt from snapshots and deltas.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplicaWorld {
    pub tick: u64,
    pub players: BTreeMap<EntityId, PlayerView>,
    pub projectiles: BTreeMap<EntityId, ProjectileView>,
    pub pickups: BTreeMap<EntityId, PickupView>,
    pub sequences: BTreeMap<EntityId, u64>,
}

impl ReplicaWorld {
    pub fn apply(&mut self, message: &SyncMessage) {
        match message {
            SyncMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            SyncMessage::Delta(delta) => self.apply_delta(delta),
        }
    }

    fn apply_snapshot(&mut self, snapshot: &SnapshotPayload) {
        *self = Self::from_snapshot(snapshot);
    }

    fn apply_delta(&mut self, delta: &DeltaPayload) {
        self.tick = delta.tick;
        for player in &delta.players {
            self.players.insert(player.id, player.clone());
        }
        for id in &delta.players_removed {
            self.players.remove(id);
        }
        for projectile in &delta.projectiles_added {
            self.projectiles.insert(projectile.id, projectile.clone());
        }
        for id in &delta.projectiles_removed {
            self.projectiles.remove(id);
        }
        for pickup in &delta.pickups {
            self.pickups.insert(pickup.id, pickup.clone());
        }
        self.sequences = delta.sequences.clone();
    }

    pub fn from_snapshot(snapshot: &SnapshotPayload) -> Self {
        Self {
            tick: snapshot.tick,
            players: snapshot.players.iter().map(|p| (p.id, p.clone())).collect(),
            projectiles: snapshot.projectiles.iter().map(|p| (p.id, p.clone())).collect(),
            pickups: snapshot.pickups.iter().map(|p| (p.id, p.clone())).collect(),
            sequences: snapshot.sequences.clone(),
        }
    }

    /// Last input the server applied for `entity`.
    pub fn acknowledged(&self, entity: EntityId) -> Option<u64> {
        self.sequences.get(&entity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InputState;
    use crate::use_cases::sync::{ConnectionSyncState, SyncSettings};
    use crate::use_cases::test_support::{TestRig, input};
    use crate::use_cases::types::{ActionRequest, WorldCommand};

    #[test]
    fn acknowledgement_returns_only_unacked_commands() {
        let mut buffer = PredictionBuffer::new(128);
        for seq in 38..=47 {
            buffer.push(input(seq, InputState::default()));
        }
        let replay: Vec<u64> = buffer.acknowledge(42).iter().map(|c| c.sequence).collect();
        assert_eq!(replay, vec![43, 44, 45, 46, 47]);
        assert_eq!(buffer.len(), 5);
        assert!(buffer.acknowledge(47).is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn corrections_smooth_small_errors_and_snap_large_ones() {
        let policy = CorrectionPolicy::default();
        let at = Vec2::new(100.0, 100.0);
        assert_eq!(policy.correct(at, at), Correction::None);
        assert!(matches!(
            policy.correct(at, Vec2::new(150.0, 100.0)),
            Correction::Smooth { step, .. } if (step.x - 10.0).abs() < 1e-4
        ));
        assert!(matches!(policy.correct(at, Vec2::new(100.0, 200.0)), Correction::Smooth { .. }));
        assert_eq!(
            policy.correct(at, Vec2::new(100.0, 200.5)),
            Correction::Snap { target: Vec2::new(100.0, 200.5) }
        );
    }

    #[test]
    fn reconnect_backoff_doubles_then_gives_up() {
        let mut policy = ReconnectPolicy::default();
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay()).map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
        assert_eq!(policy.next_delay(), None);
        policy.reset();
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(1)));
    }

    fn assert_replica_matches(replica: &ReplicaWorld, fresh: &ReplicaWorld, settings: &SyncSettings) {
        assert_eq!(replica.players.keys().collect::<Vec<_>>(), fresh.players.keys().collect::<Vec<_>>());
        assert_eq!(
            replica.projectiles.keys().collect::<Vec<_>>(),
            fresh.projectiles.keys().collect::<Vec<_>>()
        );
        assert_eq!(replica.pickups, fresh.pickups);
        assert_eq!(replica.sequences, fresh.sequences);
        for (id, truth) in &fresh.players {
            let mirror = &replica.players[id];
            assert!((mirror.position.x - truth.position.x).abs() <= settings.position_epsilon + 1e-3);
            assert!((mirror.position.y - truth.position.y).abs() <= settings.position_epsilon + 1e-3);
            assert!((mirror.velocity.x - truth.velocity.x).abs() <= settings.velocity_epsilon + 1e-3);
            assert!((mirror.velocity.y - truth.velocity.y).abs() <= settings.velocity_epsilon + 1e-3);
            assert_eq!(
                (mirror.health, mirror.alive, mirror.weapon, mirror.ammo, mirror.kills, mirror.deaths),
                (truth.health, truth.alive, truth.weapon, truth.ammo, truth.kills, truth.deaths)
            );
        }
    }

    #[test]
    fn snapshot_plus_deltas_equals_fresh_snapshot() {
        let mut rig = TestRig::new();
        let settings = SyncSettings {
            snapshot_interval: Duration::from_secs(3600),
            ..SyncSettings::default()
        };
        let a = rig.place_player(Vec2::new(400.0, 400.0));
        let b = rig.place_player(Vec2::new(700.0, 400.0));

        let mut sync = ConnectionSyncState::new();
        let mut replica = ReplicaWorld::default();
        let deliver = |rig: &TestRig, sync: &mut ConnectionSyncState, replica: &mut ReplicaWorld| {
            let now = rig.now;
            if let Some(message) = sync.plan(&rig.sim.view(), now, &settings) {
                replica.apply(&message);
                sync.commit(&message, now);
            }
        };
        deliver(&rig, &mut sync, &mut replica);

        for frame in 1..=240u64 {
            rig.advance(Duration::from_millis(16));
            let mut commands = vec![WorldCommand::Input {
                entity: a,
                command: input(frame, InputState { right: frame < 120, down: frame % 3 == 0, ..InputState::default() }),
            }];
            if frame % 40 == 0 {
                commands.push(WorldCommand::Action {
                    entity: a,
                    action: ActionRequest::Fire { aim_angle: 0.0, client_timestamp: 0 },
                });
            }
            if frame == 200 {
                commands.push(WorldCommand::Leave { entity: b });
            }
            rig.sim.step(rig.now, 0.016, commands);
            if frame % 3 == 0 {
                deliver(&rig, &mut sync, &mut replica);
            }
        }
        deliver(&rig, &mut sync, &mut replica);

        let fresh = ReplicaWorld::from_snapshot(&SnapshotPayload::from(&rig.sim.view()));
        assert_replica_matches(&replica, &fresh, &settings);
        assert_eq!(replica.acknowledged(a), Some(240));
        assert!(!replica.players.contains_key(&b));
    }
}
