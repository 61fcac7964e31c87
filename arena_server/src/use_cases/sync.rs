// Per-connection state diffing: decides between a snapshot, a delta, or nothing.
//
// Baselines track what the client was last *sent* and only move on `commit`, so a
// message the outbound queue refused is simply re-diffed next cycle.

use crate::domain::entities::EntityId;
use crate::domain::math::angle_between;
use crate::domain::world::{PickupView, PlayerView, ProjectileView, WorldView};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub snapshot_interval: Duration,
    /// Per-axis position change below which a player is considered unchanged.
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    pub angle_epsilon: f32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_secs(1),
            position_epsilon: 0.1,
            velocity_epsilon: 0.1,
            angle_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPayload {
    pub tick: u64,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<ProjectileView>,
    pub pickups: Vec<PickupView>,
    pub sequences: BTreeMap<EntityId, u64>,
}

impl From<&WorldView> for SnapshotPayload {
    fn from(view: &WorldView) -> Self {
        Self {
            tick: view.tick,
            players: view.players.clone(),
            projectiles: view.projectiles.clone(),
            pickups: view.pickups.clone(),
            sequences: view.sequences.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeltaPayload {
    pub tick: u64,
    pub players: Vec<PlayerView>,
    pub players_removed: Vec<EntityId>,
    pub projectiles_added: Vec<ProjectileView>,
    pub projectiles_removed: Vec<EntityId>,
    pub pickups: Vec<PickupView>,
    pub sequences: BTreeMap<EntityId, u64>,
}

impl DeltaPayload {
    /// True when no entity changed. The sequence map is judged separately.
    pub fn has_no_entity_changes(&self) -> bool {
        self.players.is_empty()
            && self.players_removed.is_empty()
            && self.projectiles_added.is_empty()
            && self.projectiles_removed.is_empty()
            && self.pickups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    Snapshot(SnapshotPayload),
    Delta(DeltaPayload),
}

impl SyncMessage {
    pub fn tick(&self) -> u64 {
        match self {
            SyncMessage::Snapshot(s) => s.tick,
            SyncMessage::Delta(d) => d.tick,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::Snapshot(_) => "snapshot",
            SyncMessage::Delta(_) => "delta",
        }
    }
}

/// What one connection is known to hold.
#[derive(Debug, Default)]
pub struct ConnectionSyncState {
    players: BTreeMap<EntityId, PlayerView>,
    projectiles: BTreeSet<EntityId>,
    pickups: BTreeMap<EntityId, PickupView>,
    sequences: BTreeMap<EntityId, u64>,
    last_snapshot_at: Option<Instant>,
}

impl ConnectionSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_snapshot_at(&self) -> Option<Instant> {
        self.last_snapshot_at
    }

    /// Pure: never mutates the baseline.
    pub fn plan(&self, view: &WorldView, now: Instant, settings: &SyncSettings) -> Option<SyncMessage> {
        let snapshot_due = self
            .last_snapshot_at
            .is_none_or(|at| now.saturating_duration_since(at) >= settings.snapshot_interval);
        if snapshot_due {
            return Some(SyncMessage::Snapshot(SnapshotPayload::from(view)));
        }

        let delta = self.diff(view, settings);
        if delta.has_no_entity_changes() && delta.sequences == self.sequences {
            return None;
        }
        Some(SyncMessage::Delta(delta))
    }

    /// Adopts `message` as the new baseline. Call only once the message was accepted.
    pub fn commit(&mut self, message: &SyncMessage, now: Instant) {
        match message {
            SyncMessage::Snapshot(snapshot) => {
                self.players = snapshot.players.iter().map(|p| (p.id, p.clone())).collect();
                self.projectiles = snapshot.projectiles.iter().map(|p| p.id).collect();
                self.pickups = snapshot.pickups.iter().map(|p| (p.id, p.clone())).collect();
                self.sequences = snapshot.sequences.clone();
                self.last_snapshot_at = Some(now);
            }
            SyncMessage::Delta(delta) => {
                for player in &delta.players {
                    self.players.insert(player.id, player.clone());
                }
                for id in &delta.players_removed {
                    self.players.remove(id);
                }
                for projectile in &delta.projectiles_added {
                    self.projectiles.insert(projectile.id);
                }
                for id in &delta.projectiles_removed {
                    self.projectiles.remove(id);
                }
                for pickup in &delta.pickups {
                    self.pickups.insert(pickup.id, pickup.clone());
                }
                self.sequences = delta.sequences.clone();
            }
        }
    }

    fn diff(&self, view: &WorldView, settings: &SyncSettings) -> DeltaPayload {
        let players = view
            .players
            .iter()
            .filter(|p| {
                self.players
                    .get(&p.id)
                    .is_none_or(|sent| player_changed(sent, p, settings))
            })
            .cloned()
            .collect();

        let live_players: BTreeSet<EntityId> = view.players.iter().map(|p| p.id).collect();
        let players_removed = self
            .players
            .keys()
            .filter(|id| !live_players.contains(id))
            .copied()
            .collect();

        let projectiles_added = view
            .projectiles
            .iter()
            .filter(|p| !self.projectiles.contains(&p.id))
            .cloned()
            .collect();
        let live_projectiles: BTreeSet<EntityId> = view.projectiles.iter().map(|p| p.id).collect();
        let projectiles_removed = self
            .projectiles
            .iter()
            .filter(|id| !live_projectiles.contains(id))
            .copied()
            .collect();

        let pickups = view
            .pickups
            .iter()
            .filter(|p| {
                self.pickups
                    .get(&p.id)
                    .is_none_or(|sent| sent.available != p.available || sent.weapon != p.weapon)
            })
            .cloned()
            .collect();

        DeltaPayload {
            tick: view.tick,
            players,
            players_removed,
            projectiles_added,
            projectiles_removed,
            pickups,
            sequences: view.sequences.clone(),
        }
    }
}

fn player_changed(sent: &PlayerView, now: &PlayerView, settings: &SyncSettings) -> bool {
    let moved = (sent.position.x - now.position.x).abs() > settings.position_epsilon
        || (sent.position.y - now.position.y).abs() > settings.position_epsilon;
    let accelerated = (sent.velocity.x - now.velocity.x).abs() > settings.velocity_epsilon
        || (sent.velocity.y - now.velocity.y).abs() > settings.velocity_epsilon;
    let turned = angle_between(sent.aim_angle, now.aim_angle) > settings.angle_epsilon;

    moved
        || accelerated
        || turned
        || sent.health != now.health
        || sent.alive != now.alive
        || sent.invulnerable != now.invulnerable
        || sent.rolling != now.rolling
        || sent.regenerating != now.regenerating
        || sent.sprinting != now.sprinting
        || sent.weapon != now.weapon
        || sent.ammo != now.ammo
        || sent.reloading != now.reloading
        || sent.kills != now.kills
        || sent.deaths != now.deaths
        || sent.xp != now.xp
}
