// Wire protocol DTOs and conversions for public game server messages.
// Every frame is a JSON envelope `{ type, timestamp, data? }`; payload fields are camelCase.

use crate::domain::entities::{EntityId, InputCommand, InputState};
use crate::domain::events::{EntityKind, WorldEvent};
use crate::domain::math::Vec2;
use crate::domain::world::{PickupView, PlayerView, ProjectileView};
use crate::use_cases::sync::{DeltaPayload, SnapshotPayload};
use crate::use_cases::{ActionRequest, Outgoing, SyncMessage, WorldCommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, used for envelope timestamps.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Errors produced while decoding an inbound text frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error("{kind} payload carries a non-finite aim angle")]
    NonFiniteAngle { kind: &'static str },
}

/// Inbound frame before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    timestamp: u64,
    #[serde(default)]
    data: Value,
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Input(InputCommand),
    Shoot { aim_angle: f32, client_timestamp: u64 },
    Reload,
    Melee { aim_angle: f32 },
    DodgeRoll,
    PickupAttempt { crate_id: EntityId },
    // Echo of a server ping, used for RTT measurement.
    Pong { server_time: u64 },
}

impl ClientMessage {
    /// Converts a gameplay message into a world command. `Pong` stays on the connection.
    pub fn into_command(self, entity: EntityId) -> Option<WorldCommand> {
        let action = match self {
            ClientMessage::Input(command) => return Some(WorldCommand::Input { entity, command }),
            ClientMessage::Pong { .. } => return None,
            ClientMessage::Shoot {
                aim_angle,
                client_timestamp,
            } => ActionRequest::Fire {
                aim_angle,
                client_timestamp,
            },
            ClientMessage::Reload => ActionRequest::Reload,
            ClientMessage::Melee { aim_angle } => ActionRequest::Melee { aim_angle },
            ClientMessage::DodgeRoll => ActionRequest::Roll,
            ClientMessage::PickupAttempt { crate_id } => ActionRequest::Pickup { crate_id },
        };
        Some(WorldCommand::Action { entity, action })
    }
}

/// Payload for `input:state`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputStateDto {
    sequence: u64,
    #[serde(default)]
    up: bool,
    #[serde(default)]
    down: bool,
    #[serde(default)]
    left: bool,
    #[serde(default)]
    right: bool,
    #[serde(default)]
    aim_angle: f32,
    #[serde(default)]
    is_sprinting: bool,
}

/// Payload for `player:shoot` and `player:melee_attack`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AimDto {
    aim_angle: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickupAttemptDto {
    crate_id: EntityId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PongDto {
    server_time: u64,
}

fn payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Payload { kind, source })
}

fn finite(kind: &'static str, angle: f32) -> Result<f32, DecodeError> {
    if angle.is_finite() {
        Ok(angle)
    } else {
        Err(DecodeError::NonFiniteAngle { kind })
    }
}

/// Decodes one text frame. Unknown message types yield `Ok(None)`.
pub fn decode_client_message(text: &str) -> Result<Option<ClientMessage>, DecodeError> {
    let envelope: InboundEnvelope = serde_json::from_str(text).map_err(DecodeError::Envelope)?;
    let message = match envelope.kind.as_str() {
        "input:state" => {
            let dto: InputStateDto = payload("input:state", envelope.data)?;
            ClientMessage::Input(InputCommand {
                sequence: dto.sequence,
                state: InputState {
                    up: dto.up,
                    down: dto.down,
                    left: dto.left,
                    right: dto.right,
                    aim_angle: finite("input:state", dto.aim_angle)?,
                    sprint: dto.is_sprinting,
                },
                client_timestamp: envelope.timestamp,
            })
        }
        "player:shoot" => {
            let dto: AimDto = payload("player:shoot", envelope.data)?;
            ClientMessage::Shoot {
                aim_angle: finite("player:shoot", dto.aim_angle)?,
                client_timestamp: envelope.timestamp,
            }
        }
        "player:melee_attack" => {
            let dto: AimDto = payload("player:melee_attack", envelope.data)?;
            ClientMessage::Melee {
                aim_angle: finite("player:melee_attack", dto.aim_angle)?,
            }
        }
        "player:reload" => ClientMessage::Reload,
        "player:dodge_roll" => ClientMessage::DodgeRoll,
        "weapon:pickup_attempt" => {
            let dto: PickupAttemptDto = payload("weapon:pickup_attempt", envelope.data)?;
            ClientMessage::PickupAttempt {
                crate_id: dto.crate_id,
            }
        }
        "pong" => {
            let dto: PongDto = payload("pong", envelope.data)?;
            ClientMessage::Pong {
                server_time: dto.server_time,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(message))
}

/// Outbound frame wrapper.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn encode<T: Serialize>(kind: &'static str, timestamp: u64, data: Option<T>) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope {
        kind,
        timestamp,
        data,
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PointDto {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for PointDto {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Flattened player state for snapshots and deltas.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateDto {
    pub id: EntityId,
    pub position: PointDto,
    pub velocity: PointDto,
    pub aim_angle: f32,
    pub health: i32,
    pub is_alive: bool,
    pub is_invulnerable: bool,
    pub is_rolling: bool,
    pub is_regenerating: bool,
    pub is_sprinting: bool,
    pub weapon_type: &'static str,
    pub ammo: u32,
    pub is_reloading: bool,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,
}

impl From<&PlayerView> for PlayerStateDto {
    fn from(p: &PlayerView) -> Self {
        Self {
            id: p.id,
            position: p.position.into(),
            velocity: p.velocity.into(),
            aim_angle: p.aim_angle,
            health: p.health,
            is_alive: p.alive,
            is_invulnerable: p.invulnerable,
            is_rolling: p.rolling,
            is_regenerating: p.regenerating,
            is_sprinting: p.sprinting,
            weapon_type: p.weapon.as_str(),
            ammo: p.ammo,
            is_reloading: p.reloading,
            kills: p.kills,
            deaths: p.deaths,
            xp: p.xp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileStateDto {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub weapon_type: &'static str,
    pub position: PointDto,
    pub velocity: PointDto,
}

impl From<&ProjectileView> for ProjectileStateDto {
    fn from(p: &ProjectileView) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            weapon_type: p.weapon.as_str(),
            position: p.position.into(),
            velocity: p.velocity.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrateStateDto {
    pub id: EntityId,
    pub position: PointDto,
    pub weapon_type: &'static str,
    pub is_available: bool,
}

impl From<&PickupView> for CrateStateDto {
    fn from(p: &PickupView) -> Self {
        Self {
            id: p.id,
            position: p.position.into(),
            weapon_type: p.weapon.as_str(),
            is_available: p.available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub tick: u64,
    pub players: Vec<PlayerStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
    pub weapon_crates: Vec<CrateStateDto>,
    pub last_processed_input: BTreeMap<EntityId, u64>,
}

impl From<&SnapshotPayload> for SnapshotDto {
    fn from(s: &SnapshotPayload) -> Self {
        Self {
            tick: s.tick,
            players: s.players.iter().map(PlayerStateDto::from).collect(),
            projectiles: s.projectiles.iter().map(ProjectileStateDto::from).collect(),
            weapon_crates: s.pickups.iter().map(CrateStateDto::from).collect(),
            last_processed_input: s.sequences.clone(),
        }
    }
}

/// Only non-empty change lists are transmitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaDto {
    pub tick: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerStateDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub players_removed: Vec<EntityId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projectiles_added: Vec<ProjectileStateDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projectiles_removed: Vec<EntityId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weapon_crates: Vec<CrateStateDto>,
    pub last_processed_input: BTreeMap<EntityId, u64>,
}

impl From<&DeltaPayload> for DeltaDto {
    fn from(d: &DeltaPayload) -> Self {
        Self {
            tick: d.tick,
            players: d.players.iter().map(PlayerStateDto::from).collect(),
            players_removed: d.players_removed.clone(),
            projectiles_added: d.projectiles_added.iter().map(ProjectileStateDto::from).collect(),
            projectiles_removed: d.projectiles_removed.clone(),
            weapon_crates: d.pickups.iter().map(CrateStateDto::from).collect(),
            last_processed_input: d.sequences.clone(),
        }
    }
}

/// Payloads for gameplay events. The envelope type carries the discriminant.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum EventDto {
    PlayerJoined {
        player_id: EntityId,
        position: PointDto,
    },
    PlayerDamaged {
        victim_id: EntityId,
        attacker_id: EntityId,
        damage: i32,
        new_health: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        projectile_id: Option<EntityId>,
    },
    HitConfirmed {
        victim_id: EntityId,
        damage: i32,
    },
    PlayerDeath {
        victim_id: EntityId,
        #[serde(skip_serializing_if = "Option::is_none")]
        attacker_id: Option<EntityId>,
    },
    KillCredit {
        killer_id: EntityId,
        victim_id: EntityId,
        killer_kills: u32,
        killer_xp: u32,
    },
    PlayerRespawn {
        player_id: EntityId,
        position: PointDto,
        health: i32,
    },
    EntityRemoved {
        entity_id: EntityId,
        kind: &'static str,
        reason: &'static str,
    },
    WeaponState {
        weapon_type: &'static str,
        current_ammo: u32,
        max_ammo: u32,
        is_reloading: bool,
    },
    ShootFailed {
        reason: &'static str,
    },
    ReloadComplete {
        weapon_type: &'static str,
        current_ammo: u32,
    },
    MeleeHit {
        attacker_id: EntityId,
        victims: Vec<EntityId>,
        knockback_applied: bool,
    },
    RollStart {
        player_id: EntityId,
        direction: PointDto,
    },
    PlayerRef {
        player_id: EntityId,
    },
    RollEnd {
        player_id: EntityId,
        reason: &'static str,
    },
    PickupConfirmed {
        player_id: EntityId,
        crate_id: EntityId,
        weapon_type: &'static str,
        /// Epoch milliseconds at which the crate becomes available again.
        next_respawn_time: u64,
    },
    WeaponRespawned {
        crate_id: EntityId,
        weapon_type: &'static str,
        position: PointDto,
    },
    MatchStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        time_limit_seconds: Option<u64>,
    },
    MatchTimer {
        remaining_seconds: u64,
    },
    MatchEnded {
        winners: Vec<EntityId>,
        reason: &'static str,
    },
}

/// Wire type and payload for an event, relative to the envelope timestamp.
pub fn event_message(event: &WorldEvent, timestamp: u64) -> (&'static str, EventDto) {
    match event {
        WorldEvent::PlayerJoined { entity, position } => (
            "player:joined",
            EventDto::PlayerJoined {
                player_id: *entity,
                position: (*position).into(),
            },
        ),
        WorldEvent::PlayerDamaged {
            victim,
            attacker,
            damage,
            health,
            projectile,
        } => (
            "player:damaged",
            EventDto::PlayerDamaged {
                victim_id: *victim,
                attacker_id: *attacker,
                damage: *damage,
                new_health: *health,
                projectile_id: *projectile,
            },
        ),
        WorldEvent::HitConfirmed { victim, damage, .. } => (
            "hit:confirmed",
            EventDto::HitConfirmed {
                victim_id: *victim,
                damage: *damage,
            },
        ),
        WorldEvent::PlayerDied { victim, killer } => (
            "player:death",
            EventDto::PlayerDeath {
                victim_id: *victim,
                attacker_id: *killer,
            },
        ),
        WorldEvent::KillCredit {
            killer,
            victim,
            kills,
            xp,
        } => (
            "player:kill_credit",
            EventDto::KillCredit {
                killer_id: *killer,
                victim_id: *victim,
                killer_kills: *kills,
                killer_xp: *xp,
            },
        ),
        WorldEvent::PlayerRespawned {
            entity,
            position,
            health,
        } => (
            "player:respawn",
            EventDto::PlayerRespawn {
                player_id: *entity,
                position: (*position).into(),
                health: *health,
            },
        ),
        WorldEvent::EntityRemoved {
            entity,
            kind,
            reason,
        } => (
            "entity:removed",
            EventDto::EntityRemoved {
                entity_id: *entity,
                kind: match kind {
                    EntityKind::Player => "player",
                    EntityKind::Projectile => "projectile",
                },
                reason: reason.as_str(),
            },
        ),
        WorldEvent::WeaponChanged {
            weapon,
            ammo,
            magazine_size,
            reloading,
            ..
        } => (
            "weapon:state",
            EventDto::WeaponState {
                weapon_type: weapon.as_str(),
                current_ammo: *ammo,
                max_ammo: *magazine_size,
                is_reloading: *reloading,
            },
        ),
        WorldEvent::ShootFailed { reason, .. } => (
            "shoot:failed",
            EventDto::ShootFailed {
                reason: reason.as_str(),
            },
        ),
        WorldEvent::ReloadComplete { weapon, ammo, .. } => (
            "reload:complete",
            EventDto::ReloadComplete {
                weapon_type: weapon.as_str(),
                current_ammo: *ammo,
            },
        ),
        WorldEvent::MeleeHit {
            attacker,
            victims,
            knockback,
        } => (
            "melee:hit",
            EventDto::MeleeHit {
                attacker_id: *attacker,
                victims: victims.clone(),
                knockback_applied: *knockback,
            },
        ),
        WorldEvent::RollStarted { entity, direction } => (
            "roll:start",
            EventDto::RollStart {
                player_id: *entity,
                direction: (*direction).into(),
            },
        ),
        WorldEvent::RollEnded { entity, reason } => (
            "roll:end",
            EventDto::RollEnd {
                player_id: *entity,
                reason: reason.as_str(),
            },
        ),
        WorldEvent::InvulnerabilityEnded { entity } => (
            "player:invulnerability_ended",
            EventDto::PlayerRef { player_id: *entity },
        ),
        WorldEvent::PickupConfirmed {
            entity,
            crate_id,
            weapon,
            respawn_in,
        } => (
            "weapon:pickup_confirmed",
            EventDto::PickupConfirmed {
                player_id: *entity,
                crate_id: *crate_id,
                weapon_type: weapon.as_str(),
                next_respawn_time: timestamp.saturating_add(respawn_in.as_millis() as u64),
            },
        ),
        WorldEvent::PickupRespawned {
            crate_id,
            weapon,
            position,
        } => (
            "weapon:respawned",
            EventDto::WeaponRespawned {
                crate_id: *crate_id,
                weapon_type: weapon.as_str(),
                position: (*position).into(),
            },
        ),
        WorldEvent::MatchStarted { time_limit } => (
            "match:started",
            EventDto::MatchStarted {
                time_limit_seconds: time_limit.map(|limit| limit.as_secs()),
            },
        ),
        WorldEvent::MatchTimer { remaining } => (
            "match:timer",
            EventDto::MatchTimer {
                remaining_seconds: remaining.as_secs(),
            },
        ),
        WorldEvent::MatchEnded { reason, winners } => (
            "match:ended",
            EventDto::MatchEnded {
                winners: winners.clone(),
                reason: reason.as_str(),
            },
        ),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeDto<'a> {
    pub player_id: EntityId,
    pub world_id: &'a str,
    pub arena_width: f32,
    pub arena_height: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingDto {
    pub server_time: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShutdownDto {
    pub reason: &'static str,
}

pub fn encode_sync(message: &SyncMessage, timestamp: u64) -> serde_json::Result<String> {
    match message {
        SyncMessage::Snapshot(snapshot) => encode("state:snapshot", timestamp, Some(SnapshotDto::from(snapshot))),
        SyncMessage::Delta(delta) => encode("state:delta", timestamp, Some(DeltaDto::from(delta))),
    }
}

pub fn encode_event(event: &WorldEvent, timestamp: u64) -> serde_json::Result<String> {
    let (kind, data) = event_message(event, timestamp);
    encode(kind, timestamp, Some(data))
}

pub fn encode_welcome(welcome: &WelcomeDto<'_>, timestamp: u64) -> serde_json::Result<String> {
    encode("session:welcome", timestamp, Some(welcome))
}

pub fn encode_ping(timestamp: u64) -> serde_json::Result<String> {
    encode(
        "ping",
        timestamp,
        Some(PingDto {
            server_time: timestamp,
        }),
    )
}

pub fn encode_shutdown(timestamp: u64) -> serde_json::Result<String> {
    encode(
        "server:shutdown",
        timestamp,
        Some(ShutdownDto {
            reason: "server_shutdown",
        }),
    )
}

/// Encodes anything the sync hub hands to a connection.
pub fn encode_outgoing(item: Outgoing<'_>, timestamp: u64) -> serde_json::Result<String> {
    match item {
        Outgoing::Sync(message) => encode_sync(message, timestamp),
        Outgoing::Event(event) => encode_event(event, timestamp),
        Outgoing::Shutdown => encode_shutdown(timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ShootFailure;
    use crate::domain::events::RemovalReason;
    use crate::domain::tuning::WeaponKind;
    use std::time::Duration;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).expect("valid json")
    }

    #[test]
    fn decodes_input_state_with_envelope_timestamp() {
        let text = r#"{"type":"input:state","timestamp":1700,"data":{"up":true,"left":false,"down":false,"right":true,"aimAngle":1.5,"isSprinting":true,"sequence":42}}"#;
        let message = decode_client_message(text).expect("decodes").expect("known type");
        let ClientMessage::Input(command) = message else {
            panic!("expected an input message");
        };
        assert_eq!(command.sequence, 42);
        assert_eq!(command.client_timestamp, 1700);
        assert!(command.state.up && command.state.right && command.state.sprint);
        assert!(!command.state.left && !command.state.down);
        assert_eq!(command.state.aim_angle, 1.5);
    }

    #[test]
    fn decodes_actions_into_world_commands() {
        let shoot = decode_client_message(r#"{"type":"player:shoot","timestamp":99,"data":{"aimAngle":0.25}}"#)
            .expect("decodes")
            .expect("known type");
        assert!(matches!(
            shoot.into_command(7),
            Some(WorldCommand::Action {
                entity: 7,
                action: ActionRequest::Fire { client_timestamp: 99, .. }
            })
        ));

        let reload = decode_client_message(r#"{"type":"player:reload","timestamp":1}"#)
            .expect("decodes")
            .expect("known type");
        assert!(matches!(
            reload.into_command(7),
            Some(WorldCommand::Action { action: ActionRequest::Reload, .. })
        ));

        let pickup = decode_client_message(r#"{"type":"weapon:pickup_attempt","timestamp":1,"data":{"crateId":3}}"#)
            .expect("decodes")
            .expect("known type");
        assert_eq!(pickup, ClientMessage::PickupAttempt { crate_id: 3 });

        let pong = decode_client_message(r#"{"type":"pong","timestamp":5,"data":{"serverTime":1234}}"#)
            .expect("decodes")
            .expect("known type");
        assert_eq!(pong, ClientMessage::Pong { server_time: 1234 });
        assert!(pong.into_command(7).is_none());
    }

    #[test]
    fn unknown_types_are_ignored_and_garbage_is_rejected() {
        assert!(matches!(
            decode_client_message(r#"{"type":"chat:say","timestamp":1,"data":{"text":"hi"}}"#),
            Ok(None)
        ));
        assert!(matches!(decode_client_message("not json"), Err(DecodeError::Envelope(_))));
        assert!(matches!(
            decode_client_message(r#"{"type":"input:state","timestamp":1,"data":{"up":true}}"#),
            Err(DecodeError::Payload { kind: "input:state", .. })
        ));
        assert!(matches!(
            decode_client_message(r#"{"type":"player:shoot","timestamp":1}"#),
            Err(DecodeError::Payload { kind: "player:shoot", .. })
        ));
    }

    #[test]
    fn snapshot_carries_last_processed_input() {
        let snapshot = SnapshotPayload {
            tick: 9,
            players: vec![],
            projectiles: vec![ProjectileView {
                id: 4,
                owner_id: 1,
                weapon: WeaponKind::Pistol,
                position: Vec2::new(1.0, 2.0),
                velocity: Vec2::new(800.0, 0.0),
            }],
            pickups: vec![],
            sequences: BTreeMap::from([(1, 42)]),
        };
        let value = parse(&encode_sync(&SyncMessage::Snapshot(snapshot), 1000).expect("encodes"));
        assert_eq!(value["type"], "state:snapshot");
        assert_eq!(value["timestamp"], 1000);
        assert_eq!(value["data"]["tick"], 9);
        assert_eq!(value["data"]["lastProcessedInput"]["1"], 42);
        assert_eq!(value["data"]["projectiles"][0]["ownerId"], 1);
        assert_eq!(value["data"]["projectiles"][0]["weaponType"], "pistol");
    }

    #[test]
    fn delta_omits_empty_change_lists() {
        let delta = DeltaPayload {
            tick: 3,
            projectiles_removed: vec![8],
            ..DeltaPayload::default()
        };
        let value = parse(&encode_sync(&SyncMessage::Delta(delta), 1).expect("encodes"));
        assert_eq!(value["type"], "state:delta");
        let data = value["data"].as_object().expect("object");
        assert_eq!(data["projectilesRemoved"], serde_json::json!([8]));
        assert!(!data.contains_key("players"));
        assert!(!data.contains_key("projectilesAdded"));
        assert!(data.contains_key("lastProcessedInput"));
    }

    #[test]
    fn events_use_their_wire_names() {
        let damaged = parse(
            &encode_event(
                &WorldEvent::PlayerDamaged {
                    victim: 2,
                    attacker: 1,
                    damage: 25,
                    health: 75,
                    projectile: Some(9),
                },
                10,
            )
            .expect("encodes"),
        );
        assert_eq!(damaged["type"], "player:damaged");
        assert_eq!(damaged["data"]["victimId"], 2);
        assert_eq!(damaged["data"]["attackerId"], 1);
        assert_eq!(damaged["data"]["newHealth"], 75);
        assert_eq!(damaged["data"]["projectileId"], 9);

        let failed = parse(
            &encode_event(
                &WorldEvent::ShootFailed {
                    entity: 1,
                    reason: ShootFailure::Empty,
                },
                10,
            )
            .expect("encodes"),
        );
        assert_eq!(failed["type"], "shoot:failed");
        assert_eq!(failed["data"]["reason"], "empty");

        let dead = parse(
            &encode_event(
                &WorldEvent::ShootFailed {
                    entity: 1,
                    reason: ShootFailure::Dead,
                },
                10,
            )
            .expect("encodes"),
        );
        assert_eq!(dead["data"]["reason"], "player_dead");

        let started = parse(
            &encode_event(
                &WorldEvent::MatchStarted {
                    time_limit: Some(Duration::from_secs(420)),
                },
                10,
            )
            .expect("encodes"),
        );
        assert_eq!(started["type"], "match:started");
        assert_eq!(started["data"]["timeLimitSeconds"], 420);

        let removed = parse(
            &encode_event(
                &WorldEvent::EntityRemoved {
                    entity: 5,
                    kind: EntityKind::Projectile,
                    reason: RemovalReason::OutOfRange,
                },
                10,
            )
            .expect("encodes"),
        );
        assert_eq!(removed["data"]["kind"], "projectile");
        assert_eq!(removed["data"]["reason"], "out_of_range");

        let pickup = parse(
            &encode_event(
                &WorldEvent::PickupConfirmed {
                    entity: 1,
                    crate_id: 3,
                    weapon: WeaponKind::Uzi,
                    respawn_in: Duration::from_secs(30),
                },
                1_000,
            )
            .expect("encodes"),
        );
        assert_eq!(pickup["data"]["nextRespawnTime"], 31_000);
        assert_eq!(pickup["data"]["weaponType"], "uzi");
    }

    #[test]
    fn notices_have_stable_shapes() {
        let ping = parse(&encode_ping(77).expect("encodes"));
        assert_eq!(ping["type"], "ping");
        assert_eq!(ping["data"]["serverTime"], 77);

        let shutdown = parse(&encode_outgoing(Outgoing::Shutdown, 5).expect("encodes"));
        assert_eq!(shutdown["type"], "server:shutdown");

        let welcome = parse(
            &encode_welcome(
                &WelcomeDto {
                    player_id: 3,
                    world_id: "default",
                    arena_width: 1920.0,
                    arena_height: 1080.0,
                },
                5,
            )
            .expect("encodes"),
        );
        assert_eq!(welcome["type"], "session:welcome");
        assert_eq!(welcome["data"]["playerId"], 3);
        assert_eq!(welcome["data"]["worldId"], "default");
    }
}
