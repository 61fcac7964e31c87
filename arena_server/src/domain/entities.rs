// Domain-level simulation entities and input types.

use crate::domain::math::Vec2;
use crate::domain::tuning::{WeaponKind, WeaponSpec};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub type EntityId = u64;

/// Pending inputs kept per player before the tick consumes them.
pub const MAX_PENDING_INPUTS: usize = 64;

/// Directional and aim intent as last applied by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub aim_angle: f32,
    pub sprint: bool,
}

impl InputState {
    /// Normalized movement direction (screen space, +y down).
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalized()
    }

    pub fn is_moving(&self) -> bool {
        self.direction() != Vec2::ZERO
    }
}

/// Sequenced client intent. Consumed at most once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputCommand {
    pub sequence: u64,
    pub state: InputState,
    pub client_timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    Queued,
    /// Sequence at or below the last applied one.
    Stale,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollState {
    pub started_at: Instant,
    pub direction: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootFailure {
    NoPlayer,
    Dead,
    Reloading,
    Empty,
    Cooldown,
    NotRanged,
    NotMelee,
    MatchOver,
}

impl ShootFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            ShootFailure::NoPlayer => "no_player",
            ShootFailure::Dead => "player_dead",
            ShootFailure::Reloading => "reloading",
            ShootFailure::Empty => "empty",
            ShootFailure::Cooldown => "cooldown",
            ShootFailure::NotRanged => "not_ranged",
            ShootFailure::NotMelee => "not_melee",
            ShootFailure::MatchOver => "match_over",
        }
    }
}

/// Ammo, reload and fire-rate state for the weapon a player holds.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponState {
    pub kind: WeaponKind,
    pub ammo: u32,
    pub magazine_size: u32,
    pub reload_ready_at: Option<Instant>,
    pub last_shot_at: Option<Instant>,
    /// Consecutive shots used for recoil accumulation.
    pub burst: u32,
}

impl WeaponState {
    pub fn new(spec: &WeaponSpec) -> Self {
        Self {
            kind: spec.kind,
            ammo: spec.magazine_size,
            magazine_size: spec.magazine_size,
            reload_ready_at: None,
            last_shot_at: None,
            burst: 0,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_ready_at.is_some()
    }

    fn cooling_down(&self, now: Instant, spec: &WeaponSpec) -> bool {
        self.last_shot_at
            .is_some_and(|last| now.saturating_duration_since(last) < spec.cooldown())
    }

    pub fn check_fire(&self, now: Instant, spec: &WeaponSpec) -> Result<(), ShootFailure> {
        if spec.is_melee() {
            return Err(ShootFailure::NotRanged);
        }
        if self.is_reloading() {
            return Err(ShootFailure::Reloading);
        }
        if self.ammo == 0 {
            return Err(ShootFailure::Empty);
        }
        if self.cooling_down(now, spec) {
            return Err(ShootFailure::Cooldown);
        }
        Ok(())
    }

    pub fn check_swing(&self, now: Instant, spec: &WeaponSpec) -> Result<(), ShootFailure> {
        if !spec.is_melee() {
            return Err(ShootFailure::NotMelee);
        }
        if self.cooling_down(now, spec) {
            return Err(ShootFailure::Cooldown);
        }
        Ok(())
    }

    /// Consumes a round (ranged) and stamps the fire-rate clock.
    pub fn record_shot(&mut self, now: Instant, spec: &WeaponSpec) {
        let recovered = match (self.last_shot_at, spec.recoil) {
            (Some(last), Some(recoil)) => {
                now.saturating_duration_since(last).as_secs_f32() >= recoil.recovery_time
            }
            _ => true,
        };
        self.burst = if recovered { 1 } else { self.burst + 1 };
        self.last_shot_at = Some(now);
        if !spec.is_melee() {
            self.ammo = self.ammo.saturating_sub(1);
        }
    }

    /// Returns false when already reloading, full, or holding a melee weapon.
    pub fn start_reload(&mut self, now: Instant, spec: &WeaponSpec) -> bool {
        if spec.is_melee() || self.is_reloading() || self.ammo >= self.magazine_size {
            return false;
        }
        self.reload_ready_at = Some(now + spec.reload_time);
        true
    }

    /// Completes a due reload. Returns true exactly once per reload.
    pub fn finish_reload_if_due(&mut self, now: Instant) -> bool {
        match self.reload_ready_at {
            Some(ready) if now >= ready => {
                self.reload_ready_at = None;
                self.ammo = self.magazine_size;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_reload(&mut self) {
        self.reload_ready_at = None;
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f32,

    // Combat state.
    pub health: i32,
    pub alive: bool,
    pub died_at: Option<Instant>,
    pub invulnerable: bool,
    pub invulnerable_until: Option<Instant>,
    pub weapon: WeaponState,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,

    // Regeneration bookkeeping.
    pub last_damage_at: Option<Instant>,
    pub regenerating: bool,
    pub regen_accumulator: f32,

    // Movement state (input is never trusted beyond intent).
    pub input: InputState,
    pub last_applied_sequence: Option<u64>,
    pending_inputs: BTreeMap<u64, InputCommand>,
    pub roll: Option<RollState>,
    pub last_roll_at: Option<Instant>,

    /// Averaged round-trip time reported by the connection layer.
    pub rtt: Duration,
}

impl Player {
    pub fn new(id: EntityId, position: Vec2, health: i32, weapon: WeaponState) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            aim_angle: 0.0,
            health,
            alive: true,
            died_at: None,
            invulnerable: false,
            invulnerable_until: None,
            weapon,
            kills: 0,
            deaths: 0,
            xp: 0,
            last_damage_at: None,
            regenerating: false,
            regen_accumulator: 0.0,
            input: InputState::default(),
            last_applied_sequence: None,
            pending_inputs: BTreeMap::new(),
            roll: None,
            last_roll_at: None,
            rtt: Duration::ZERO,
        }
    }

    /// Buffers a command until the next input phase. Regressions are rejected.
    pub fn queue_input(&mut self, command: InputCommand) -> QueueOutcome {
        if self
            .last_applied_sequence
            .is_some_and(|applied| command.sequence <= applied)
        {
            return QueueOutcome::Stale;
        }
        if self.pending_inputs.contains_key(&command.sequence) {
            return QueueOutcome::Duplicate;
        }
        if self.pending_inputs.len() >= MAX_PENDING_INPUTS {
            self.pending_inputs.pop_first();
        }
        self.pending_inputs.insert(command.sequence, command);
        QueueOutcome::Queued
    }

    /// Drains buffered commands in ascending sequence order.
    pub fn take_pending_inputs(&mut self) -> impl Iterator<Item = InputCommand> + use<> {
        std::mem::take(&mut self.pending_inputs).into_values()
    }

    pub fn pending_input_count(&self) -> usize {
        self.pending_inputs.len()
    }

    pub fn is_rolling(&self) -> bool {
        self.roll.is_some()
    }

    pub fn in_roll_iframes(&self, now: Instant, iframes: Duration) -> bool {
        self.roll
            .is_some_and(|roll| now.saturating_duration_since(roll.started_at) < iframes)
    }

    /// Whether hit resolution may consider this player at all.
    pub fn is_hittable(&self, now: Instant, iframes: Duration) -> bool {
        self.alive && !self.invulnerable && !self.in_roll_iframes(now, iframes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub weapon: WeaponKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub spawn_position: Vec2,
    pub spawned_at: Instant,
    pub damage: i32,
    pub max_range: f32,
}

impl Projectile {
    pub fn distance_travelled(&self) -> f32 {
        self.spawn_position.distance(self.position)
    }
}

/// Weapon crate. Unavailable crates stay in the world until their respawn deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub id: EntityId,
    pub position: Vec2,
    pub weapon: WeaponKind,
    pub available: bool,
    pub respawn_at: Option<Instant>,
}
