// Discrete gameplay events emitted at the end of every tick.

use crate::domain::entities::{EntityId, ShootFailure};
use crate::domain::math::Vec2;
use crate::domain::tuning::WeaponKind;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Projectile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Disconnected,
    Expired,
    OutOfRange,
    OutOfBounds,
    Hit,
    OwnerLeft,
}

impl RemovalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RemovalReason::Disconnected => "disconnected",
            RemovalReason::Expired => "expired",
            RemovalReason::OutOfRange => "out_of_range",
            RemovalReason::OutOfBounds => "out_of_bounds",
            RemovalReason::Hit => "hit",
            RemovalReason::OwnerLeft => "owner_left",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollEndReason {
    Completed,
    Wall,
    Died,
}

impl RollEndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RollEndReason::Completed => "completed",
            RollEndReason::Wall => "wall_collision",
            RollEndReason::Died => "died",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEndReason {
    KillTarget,
    TimeLimit,
}

impl MatchEndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchEndReason::KillTarget => "kill_target",
            MatchEndReason::TimeLimit => "time_limit",
        }
    }
}

/// Who should hear about an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Entity(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    PlayerJoined {
        entity: EntityId,
        position: Vec2,
    },
    PlayerDamaged {
        victim: EntityId,
        attacker: EntityId,
        damage: i32,
        health: i32,
        projectile: Option<EntityId>,
    },
    HitConfirmed {
        attacker: EntityId,
        victim: EntityId,
        damage: i32,
    },
    PlayerDied {
        victim: EntityId,
        killer: Option<EntityId>,
    },
    KillCredit {
        killer: EntityId,
        victim: EntityId,
        kills: u32,
        xp: u32,
    },
    PlayerRespawned {
        entity: EntityId,
        position: Vec2,
        health: i32,
    },
    EntityRemoved {
        entity: EntityId,
        kind: EntityKind,
        reason: RemovalReason,
    },
    WeaponChanged {
        entity: EntityId,
        weapon: WeaponKind,
        ammo: u32,
        magazine_size: u32,
        reloading: bool,
    },
    ShootFailed {
        entity: EntityId,
        reason: ShootFailure,
    },
    ReloadComplete {
        entity: EntityId,
        weapon: WeaponKind,
        ammo: u32,
    },
    MeleeHit {
        attacker: EntityId,
        victims: Vec<EntityId>,
        knockback: bool,
    },
    RollStarted {
        entity: EntityId,
        direction: Vec2,
    },
    RollEnded {
        entity: EntityId,
        reason: RollEndReason,
    },
    InvulnerabilityEnded {
        entity: EntityId,
    },
    PickupConfirmed {
        entity: EntityId,
        crate_id: EntityId,
        weapon: WeaponKind,
        respawn_in: Duration,
    },
    PickupRespawned {
        crate_id: EntityId,
        weapon: WeaponKind,
        position: Vec2,
    },
    MatchStarted {
        time_limit: Option<Duration>,
    },
    MatchTimer {
        remaining: Duration,
    },
    MatchEnded {
        reason: MatchEndReason,
        winners: Vec<EntityId>,
    },
}

impl WorldEvent {
    pub fn audience(&self) -> Audience {
        match self {
            WorldEvent::HitConfirmed { attacker, .. } => Audience::Entity(*attacker),
            WorldEvent::WeaponChanged { entity, .. }
            | WorldEvent::ShootFailed { entity, .. }
            | WorldEvent::ReloadComplete { entity, .. } => Audience::Entity(*entity),
            _ => Audience::All,
        }
    }
}

/// Port through which the simulation publishes events it has no business delivering itself.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: WorldEvent);
}
