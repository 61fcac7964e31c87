// Authoritative world step. One call to `step` is one tick, phases in fixed order.

use super::types::WorldCommand;
use crate::domain::entities::{EntityId, InputCommand, Player, QueueOutcome, WeaponState};
use crate::domain::events::{EntityKind, EventSink, RemovalReason, RollEndReason, WorldEvent};
use crate::domain::history::PositionHistory;
use crate::domain::match_rules::{MatchRules, MatchState};
use crate::domain::math::{Vec2, sanitize};
use crate::domain::physics::{self, Rect};
use crate::domain::rng::GameRng;
use crate::domain::tuning::{PlayerTuning, Tuning, WeaponKind};
use crate::domain::world::{World, WorldView};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub tuning: Arc<Tuning>,
    pub rules: MatchRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub events: usize,
}

pub struct Simulation {
    pub(super) world: World,
    pub(super) history: PositionHistory,
    pub(super) tuning: Arc<Tuning>,
    pub(super) rng: Arc<GameRng>,
    pub(super) match_state: MatchState,
    /// Events produced by phases 1-3, published in phase 4.
    pub(super) events: Vec<WorldEvent>,
    sink: Arc<dyn EventSink>,
    tick: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig, rng: Arc<GameRng>, sink: Arc<dyn EventSink>) -> Self {
        let mut world = World::new();
        for (position, weapon) in &config.tuning.arena.crates {
            world.add_pickup(*position, *weapon);
        }

        Self {
            world,
            history: PositionHistory::new(),
            tuning: config.tuning,
            rng,
            match_state: MatchState::new(config.rules),
            events: Vec::new(),
            sink,
            tick: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn is_match_over(&self) -> bool {
        self.match_state.is_over()
    }

    pub fn is_match_started(&self) -> bool {
        self.match_state.is_started()
    }

    /// Consistent copy for readers; callers hold the read lock only while this runs.
    pub fn view(&self) -> WorldView {
        self.world.view(self.tick)
    }

    /// Spawns a player entity at a balanced spawn point.
    pub fn add_player(&mut self, now: Instant) -> EntityId {
        let id = self.world.allocate_id();
        let position = self.choose_spawn_point(None);
        let mut player = Player::new(
            id,
            position,
            self.tuning.player.max_health,
            WeaponState::new(self.tuning.weapons.get(WeaponKind::Pistol)),
        );
        player.invulnerable = true;
        player.invulnerable_until = Some(now + self.tuning.player.spawn_invulnerability);

        self.world.insert_player(player);
        self.history.record(id, position, now);
        self.events.push(WorldEvent::PlayerJoined {
            entity: id,
            position,
        });
        info!(entity_id = id, x = position.x, y = position.y, "player joined");
        self.start_match(now);
        id
    }

    /// Removes a player entity. Returns false if it was already gone.
    pub fn remove_player(&mut self, id: EntityId) -> bool {
        let Some((_player, projectiles)) = self.world.remove_player(id) else {
            debug!(entity_id = id, "remove for unknown player ignored");
            return false;
        };
        self.history.remove(id);
        self.events.push(WorldEvent::EntityRemoved {
            entity: id,
            kind: EntityKind::Player,
            reason: RemovalReason::Disconnected,
        });
        for projectile in projectiles {
            self.events.push(WorldEvent::EntityRemoved {
                entity: projectile,
                kind: EntityKind::Projectile,
                reason: RemovalReason::OwnerLeft,
            });
        }
        info!(entity_id = id, "player left");
        if self.world.player_count() == 0 && self.match_state.is_started() {
            self.match_state.reset();
            info!("world empty; match reset");
        }
        true
    }

    /// Runs one tick. `dt` is measured elapsed seconds since the previous tick.
    pub fn step(
        &mut self,
        now: Instant,
        dt: f32,
        commands: impl IntoIterator<Item = WorldCommand>,
    ) -> TickReport {
        let dt = sanitize(dt, "dt").max(0.0);
        self.tick += 1;

        self.input_phase(now, commands);
        self.motion_phase(now, dt);
        self.lifecycle_phase(now, dt);
        let events = self.callback_phase();

        TickReport {
            tick: self.tick,
            events,
        }
    }

    // Phase 1: commands in receipt order, then buffered inputs in sequence order, then actions.
    fn input_phase(&mut self, now: Instant, commands: impl IntoIterator<Item = WorldCommand>) {
        let mut actions = Vec::new();
        for command in commands {
            match command {
                WorldCommand::Join { reply } => {
                    let id = self.add_player(now);
                    if reply.send(id).is_err() {
                        debug!(entity_id = id, "joining connection went away; releasing entity");
                        self.remove_player(id);
                    }
                }
                WorldCommand::Leave { entity } => {
                    self.remove_player(entity);
                }
                WorldCommand::Input { entity, command } => self.queue_input(entity, command),
                WorldCommand::Action { entity, action } => actions.push((entity, action)),
                WorldCommand::ReportRtt { entity, rtt } => {
                    if let Some(player) = self.world.player_mut(entity) {
                        player.rtt = rtt;
                    }
                }
            }
        }

        let match_over = self.match_state.is_over();
        for player in self.world.players_mut() {
            for command in player.take_pending_inputs() {
                // Acknowledged but not applied while the match is over.
                if match_over {
                    player.last_applied_sequence = Some(command.sequence);
                    continue;
                }
                let mut state = command.state;
                state.aim_angle = sanitize(state.aim_angle, "aim angle");
                player.input = state;
                player.aim_angle = state.aim_angle;
                player.last_applied_sequence = Some(command.sequence);
            }
        }

        for (entity, action) in actions {
            self.perform_action(entity, action, now);
        }
    }

    fn queue_input(&mut self, entity: EntityId, command: InputCommand) {
        let Some(player) = self.world.player_mut(entity) else {
            debug!(entity_id = entity, "input for unknown player ignored");
            return;
        };
        match player.queue_input(command) {
            QueueOutcome::Queued => {}
            QueueOutcome::Stale => {
                debug!(entity_id = entity, sequence = command.sequence, "stale input discarded");
            }
            QueueOutcome::Duplicate => {
                debug!(entity_id = entity, sequence = command.sequence, "duplicate input discarded");
            }
        }
    }

    // Phase 2: integrate players and projectiles, resolve projectile hits.
    fn motion_phase(&mut self, now: Instant, dt: f32) {
        let bounds = physics::player_bounds(&self.tuning.arena, &self.tuning.player);
        let player_tuning = self.tuning.player;
        let roll_speed = self.tuning.roll.speed;
        let frozen = self.match_state.is_over();

        for player in self.world.players_mut() {
            if !player.alive {
                continue;
            }
            let velocity = match player.roll {
                Some(roll) => roll.direction * roll_speed,
                None if frozen => Vec2::ZERO,
                None => physics::steer_velocity(player.velocity, &player.input, &player_tuning, dt),
            };
            let motion = physics::integrate(player.position, velocity, dt, &bounds);
            player.position = motion.position;
            player.velocity = motion.velocity;

            if motion.clamped && player.roll.take().is_some() {
                self.events.push(WorldEvent::RollEnded {
                    entity: player.id,
                    reason: RollEndReason::Wall,
                });
            }
            self.history.record(player.id, player.position, now);
        }

        self.advance_projectiles(now, dt);
    }

    fn advance_projectiles(&mut self, now: Instant, dt: f32) {
        let arena = physics::arena_bounds(&self.tuning.arena);
        let radius = self.tuning.projectile.radius;
        let iframes = self.tuning.roll.iframes;
        let player_tuning = self.tuning.player;

        let ids: Vec<EntityId> = self.world.projectiles().map(|p| p.id).collect();
        for id in ids {
            let Some(projectile) = self.world.projectile_mut(id) else {
                continue;
            };
            projectile.position += projectile.velocity.sanitized("projectile velocity") * dt;
            let (position, owner, damage) = (projectile.position, projectile.owner_id, projectile.damage);

            let removal = if !arena.contains(position) {
                Some(RemovalReason::OutOfBounds)
            } else if projectile.distance_travelled() > projectile.max_range {
                Some(RemovalReason::OutOfRange)
            } else {
                None
            };
            if let Some(reason) = removal {
                self.remove_projectile(id, reason);
                continue;
            }

            let victim = self
                .world
                .players()
                .filter(|p| p.id != owner && p.is_hittable(now, iframes))
                .find(|p| {
                    physics::circle_hits_rect(position, radius, &Rect::player(p.position, &player_tuning))
                })
                .map(|p| p.id);
            if let Some(victim) = victim {
                self.remove_projectile(id, RemovalReason::Hit);
                self.apply_damage(victim, owner, damage, Some(id), now);
            }
        }
    }

    pub(super) fn remove_projectile(&mut self, id: EntityId, reason: RemovalReason) {
        if self.world.remove_projectile(id).is_some() {
            self.events.push(WorldEvent::EntityRemoved {
                entity: id,
                kind: EntityKind::Projectile,
                reason,
            });
        }
    }

    // Phase 3: timers. Every transition here produces at most one event.
    fn lifecycle_phase(&mut self, now: Instant, dt: f32) {
        let tuning = Arc::clone(&self.tuning);

        let expired: Vec<EntityId> = self
            .world
            .projectiles()
            .filter(|p| now.saturating_duration_since(p.spawned_at) >= tuning.projectile.life_time)
            .map(|p| p.id)
            .collect();
        for id in expired {
            self.remove_projectile(id, RemovalReason::Expired);
        }

        let mut respawns = Vec::new();
        for player in self.world.players_mut() {
            if player.weapon.finish_reload_if_due(now) {
                self.events.push(WorldEvent::ReloadComplete {
                    entity: player.id,
                    weapon: player.weapon.kind,
                    ammo: player.weapon.ammo,
                });
            }

            if let Some(roll) = player.roll
                && now.saturating_duration_since(roll.started_at) >= tuning.roll.duration
            {
                player.roll = None;
                self.events.push(WorldEvent::RollEnded {
                    entity: player.id,
                    reason: RollEndReason::Completed,
                });
            }

            if player.invulnerable && player.invulnerable_until.is_none_or(|until| now >= until) {
                player.invulnerable = false;
                player.invulnerable_until = None;
                self.events.push(WorldEvent::InvulnerabilityEnded { entity: player.id });
            }

            if !player.alive {
                if player
                    .died_at
                    .is_some_and(|died| now.saturating_duration_since(died) >= tuning.player.respawn_delay)
                {
                    respawns.push(player.id);
                }
                continue;
            }

            regenerate(player, now, dt, &tuning.player);
        }

        for id in respawns {
            self.respawn_player(id, now);
        }

        for pickup in self.world.pickups_mut() {
            if !pickup.available && pickup.respawn_at.is_some_and(|at| now >= at) {
                pickup.available = true;
                pickup.respawn_at = None;
                self.events.push(WorldEvent::PickupRespawned {
                    crate_id: pickup.id,
                    weapon: pickup.weapon,
                    position: pickup.position,
                });
            }
        }

        self.evaluate_match(now);
    }

    fn respawn_player(&mut self, id: EntityId, now: Instant) {
        let position = self.choose_spawn_point(Some(id));
        let tuning = Arc::clone(&self.tuning);
        let Some(player) = self.world.player_mut(id) else {
            return;
        };

        player.position = position;
        player.velocity = Vec2::ZERO;
        player.health = tuning.player.max_health;
        player.alive = true;
        player.died_at = None;
        player.roll = None;
        player.regenerating = false;
        player.regen_accumulator = 0.0;
        player.last_damage_at = None;
        player.weapon = WeaponState::new(tuning.weapons.get(WeaponKind::Pistol));
        player.invulnerable = true;
        player.invulnerable_until = Some(now + tuning.player.spawn_invulnerability);
        let health = player.health;

        // Rewinds must never interpolate across the teleport.
        self.history.clear(id);
        self.history.record(id, position, now);
        self.events.push(WorldEvent::PlayerRespawned {
            entity: id,
            position,
            health,
        });
        info!(entity_id = id, x = position.x, y = position.y, "player respawned");
    }

    /// Best of N random candidates, scored by distance to the nearest living enemy.
    pub(super) fn choose_spawn_point(&self, exclude: Option<EntityId>) -> Vec2 {
        let arena = &self.tuning.arena;
        let margin = arena.spawn_margin;
        let min = Vec2::new(margin, margin);
        let max = Vec2::new(arena.width - margin, arena.height - margin);
        let enemies: Vec<Vec2> = self
            .world
            .players()
            .filter(|p| p.alive && Some(p.id) != exclude)
            .map(|p| p.position)
            .collect();

        let mut best = min;
        let mut best_score = f32::NEG_INFINITY;
        for _ in 0..arena.spawn_candidates.max(1) {
            let candidate = self.rng.point_in(min, max);
            let score = enemies
                .iter()
                .map(|e| e.distance_squared(candidate))
                .fold(f32::INFINITY, f32::min);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }
        best
    }

    fn start_match(&mut self, now: Instant) {
        if self.match_state.start(now) {
            let time_limit = self.match_state.rules().time_limit;
            info!(time_limit_secs = time_limit.map(|t| t.as_secs()), "match started");
            self.events.push(WorldEvent::MatchStarted { time_limit });
        }
    }

    /// Fresh match after the intermission: scores cleared, everyone respawned.
    fn restart_match(&mut self, now: Instant) {
        self.match_state.reset();
        let ids = self.world.player_ids();
        if ids.is_empty() {
            return;
        }
        for player in self.world.players_mut() {
            player.kills = 0;
            player.deaths = 0;
            player.xp = 0;
            player.input = Default::default();
        }
        for id in ids {
            self.respawn_player(id, now);
        }
        self.start_match(now);
    }

    fn evaluate_match(&mut self, now: Instant) {
        if self.match_state.intermission_elapsed(now) {
            self.restart_match(now);
            return;
        }
        if let Some(remaining) = self.match_state.timer_tick(now) {
            self.events.push(WorldEvent::MatchTimer { remaining });
        }
        let scores = self.world.players().map(|p| (p.id, p.kills));
        if let Some(outcome) = self.match_state.evaluate(now, scores) {
            info!(
                reason = outcome.reason.as_str(),
                winners = ?outcome.winners,
                "match ended"
            );
            self.events.push(WorldEvent::MatchEnded {
                reason: outcome.reason,
                winners: outcome.winners,
            });
        }
    }

    // Phase 4: publish exactly once, in production order.
    fn callback_phase(&mut self) -> usize {
        let count = self.events.len();
        for event in self.events.drain(..) {
            self.sink.publish(event);
        }
        count
    }
}

fn regenerate(player: &mut Player, now: Instant, dt: f32, tuning: &PlayerTuning) {
    if player.health >= tuning.max_health {
        player.regenerating = false;
        player.regen_accumulator = 0.0;
        return;
    }
    let rested = player
        .last_damage_at
        .is_none_or(|at| now.saturating_duration_since(at) >= tuning.regen_delay);
    player.regenerating = rested;
    if !rested {
        return;
    }

    player.regen_accumulator += tuning.regen_per_second * dt;
    if player.regen_accumulator >= 1.0 {
        let whole = player.regen_accumulator.floor();
        player.regen_accumulator -= whole;
        player.health = (player.health + whole as i32).min(tuning.max_health);
        if player.health >= tuning.max_health {
            player.regenerating = false;
            player.regen_accumulator = 0.0;
        }
    }
}
