// Discrete player actions resolved during the input phase.

use super::simulation::Simulation;
use super::types::ActionRequest;
use crate::domain::entities::{EntityId, Projectile, RollState, ShootFailure, WeaponState};
use crate::domain::events::{RollEndReason, WorldEvent};
use crate::domain::history::rewind_target;
use crate::domain::math::{Vec2, sanitize};
use crate::domain::physics::{self, MeleeCandidate, MeleeSwing, Rect};
use crate::domain::tuning::{WeaponKind, WeaponSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// Ids of the spawned projectiles, one per pellet.
    Projectiles(Vec<EntityId>),
    /// Victims of an instant hit, in pellet order.
    Hitscan { victims: Vec<EntityId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target missing, already dead, or the damage was not positive.
    Ignored,
    Wounded,
    Killed,
}

impl DamageOutcome {
    pub fn landed(self) -> bool {
        self != DamageOutcome::Ignored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupRejection {
    NoPlayer,
    Dead,
    UnknownCrate,
    Unavailable,
    TooFar,
}

impl Simulation {
    pub(super) fn perform_action(&mut self, entity: EntityId, action: ActionRequest, now: Instant) {
        let attack = matches!(action, ActionRequest::Fire { .. } | ActionRequest::Melee { .. });
        if self.match_state.is_over() && !attack {
            debug!(entity_id = entity, ?action, "action ignored between matches");
            return;
        }

        match action {
            ActionRequest::Fire {
                aim_angle,
                client_timestamp,
            } => {
                if let Err(reason) = self.fire(entity, aim_angle, now) {
                    debug!(entity_id = entity, client_timestamp, reason = reason.as_str(), "shot rejected");
                    self.events.push(WorldEvent::ShootFailed { entity, reason });
                }
            }
            ActionRequest::Melee { aim_angle } => {
                if let Err(reason) = self.melee(entity, aim_angle, now) {
                    self.events.push(WorldEvent::ShootFailed { entity, reason });
                }
            }
            ActionRequest::Roll => {
                if !self.start_roll(entity, now) {
                    debug!(entity_id = entity, "dodge roll rejected");
                }
            }
            ActionRequest::Reload => {
                if !self.reload(entity, now) {
                    debug!(entity_id = entity, "reload rejected");
                }
            }
            ActionRequest::Pickup { crate_id } => {
                if let Err(rejection) = self.pickup(entity, crate_id, now) {
                    debug!(entity_id = entity, crate_id, ?rejection, "pickup rejected");
                }
            }
        }
    }

    pub(crate) fn fire(
        &mut self,
        entity: EntityId,
        aim_angle: f32,
        now: Instant,
    ) -> Result<FireOutcome, ShootFailure> {
        if self.match_state.is_over() {
            return Err(ShootFailure::MatchOver);
        }
        let tuning = Arc::clone(&self.tuning);
        let player = self.world.player_mut(entity).ok_or(ShootFailure::NoPlayer)?;
        if !player.alive {
            return Err(ShootFailure::Dead);
        }
        let spec = tuning.weapons.get(player.weapon.kind);
        player.weapon.check_fire(now, spec)?;

        let aim = sanitize(aim_angle, "aim angle");
        player.aim_angle = aim;
        player.weapon.record_shot(now, spec);
        let burst = player.weapon.burst;
        let moving = player.input.is_moving();
        let origin = player.position;
        let rtt = player.rtt;

        if player.weapon.ammo == 0 && player.weapon.start_reload(now, spec) {
            let weapon = player.weapon.clone();
            self.events.push(weapon_changed(entity, &weapon));
        }

        let angles = self.shot_angles(spec, aim, burst, moving);
        if spec.hitscan {
            let victims = self.resolve_hitscan(entity, origin, &angles, spec, rewind_target(now, rtt), now);
            return Ok(FireOutcome::Hitscan { victims });
        }

        let ids = angles
            .into_iter()
            .map(|angle| self.spawn_projectile(entity, origin, angle, spec, now))
            .collect();
        Ok(FireOutcome::Projectiles(ids))
    }

    /// Final direction of every pellet: aim + recoil + movement spread, fanned across the arc.
    fn shot_angles(&self, spec: &WeaponSpec, aim: f32, burst: u32, moving: bool) -> Vec<f32> {
        let mut center = aim;
        if let Some(recoil) = spec.recoil {
            let vertical = (burst.saturating_sub(1) as f32 * recoil.vertical_per_shot)
                .min(recoil.max_accumulation);
            let horizontal = self.rng.symmetric(recoil.horizontal_per_shot);
            center += (vertical + horizontal).to_radians();
        }
        if moving {
            center += self.rng.symmetric(spec.spread_degrees).to_radians();
        }

        if spec.pellets <= 1 {
            return vec![center];
        }
        let arc = spec.arc_degrees.to_radians();
        let step = arc / (spec.pellets - 1) as f32;
        (0..spec.pellets)
            .map(|i| center - arc / 2.0 + step * i as f32 + self.rng.symmetric(step / 4.0))
            .collect()
    }

    fn spawn_projectile(
        &mut self,
        owner: EntityId,
        origin: Vec2,
        angle: f32,
        spec: &WeaponSpec,
        now: Instant,
    ) -> EntityId {
        let id = self.world.allocate_id();
        self.world.insert_projectile(Projectile {
            id,
            owner_id: owner,
            weapon: spec.kind,
            position: origin,
            velocity: Vec2::from_angle(angle) * spec.projectile_speed,
            spawn_position: origin,
            spawned_at: now,
            damage: spec.pellet_damage(),
            max_range: spec.range,
        });
        id
    }

    /// Casts each pellet against positions rewound to `target`; the nearest body wins.
    fn resolve_hitscan(
        &mut self,
        shooter: EntityId,
        origin: Vec2,
        angles: &[f32],
        spec: &WeaponSpec,
        target: Instant,
        now: Instant,
    ) -> Vec<EntityId> {
        let iframes = self.tuning.roll.iframes;
        let player_tuning = self.tuning.player;
        let bodies: Vec<(EntityId, Rect)> = self
            .world
            .players()
            .filter(|p| p.id != shooter && p.is_hittable(now, iframes))
            .map(|p| {
                let position = self.history.rewound_position(p.id, target, p.position);
                (p.id, Rect::player(position, &player_tuning))
            })
            .collect();

        let mut victims = Vec::new();
        for angle in angles {
            let nearest = bodies
                .iter()
                .filter_map(|(id, rect)| {
                    physics::ray_hits_rect(origin, *angle, spec.range, rect).map(|d| (*id, d))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((victim, _)) = nearest
                && self.apply_damage(victim, shooter, spec.pellet_damage(), None, now).landed()
            {
                victims.push(victim);
            }
        }
        victims
    }

    pub(crate) fn melee(
        &mut self,
        entity: EntityId,
        aim_angle: f32,
        now: Instant,
    ) -> Result<Vec<EntityId>, ShootFailure> {
        if self.match_state.is_over() {
            return Err(ShootFailure::MatchOver);
        }
        let tuning = Arc::clone(&self.tuning);
        let player = self.world.player_mut(entity).ok_or(ShootFailure::NoPlayer)?;
        if !player.alive {
            return Err(ShootFailure::Dead);
        }
        let spec = tuning.weapons.get(player.weapon.kind);
        player.weapon.check_swing(now, spec)?;

        let facing = sanitize(aim_angle, "aim angle");
        player.aim_angle = facing;
        player.weapon.record_shot(now, spec);
        let swing = MeleeSwing {
            attacker: entity,
            origin: player.position,
            facing,
            range: spec.range,
            arc_degrees: spec.arc_degrees,
        };

        let iframes = tuning.roll.iframes;
        let candidates: Vec<MeleeCandidate> = self
            .world
            .players()
            .map(|p| MeleeCandidate {
                id: p.id,
                position: p.position,
                hittable: p.is_hittable(now, iframes),
            })
            .collect();
        let knockback = spec.knockback_distance > 0.0;
        let bounds = physics::player_bounds(&tuning.arena, &tuning.player);
        let mut victims = Vec::new();
        for victim in physics::melee_targets(&swing, &candidates) {
            let outcome = self.apply_damage(victim, entity, spec.damage, None, now);
            if !outcome.landed() {
                continue;
            }
            victims.push(victim);
            if knockback
                && outcome == DamageOutcome::Wounded
                && let Some(target) = self.world.player_mut(victim)
            {
                target.position =
                    physics::knockback(swing.origin, target.position, spec.knockback_distance, &bounds);
            }
        }
        if victims.is_empty() {
            return Ok(victims);
        }
        self.events.push(WorldEvent::MeleeHit {
            attacker: entity,
            victims: victims.clone(),
            knockback,
        });
        Ok(victims)
    }

    pub(crate) fn start_roll(&mut self, entity: EntityId, now: Instant) -> bool {
        let roll = self.tuning.roll;
        let Some(player) = self.world.player_mut(entity) else {
            return false;
        };
        if !player.alive || player.is_rolling() {
            return false;
        }
        if player
            .last_roll_at
            .is_some_and(|last| now.saturating_duration_since(last) < roll.cooldown)
        {
            return false;
        }

        let direction = match player.input.direction() {
            Vec2::ZERO => Vec2::from_angle(player.aim_angle),
            moving => moving,
        };
        player.roll = Some(RollState {
            started_at: now,
            direction,
        });
        player.last_roll_at = Some(now);
        self.events.push(WorldEvent::RollStarted { entity, direction });
        true
    }

    pub(crate) fn reload(&mut self, entity: EntityId, now: Instant) -> bool {
        let tuning = Arc::clone(&self.tuning);
        let Some(player) = self.world.player_mut(entity) else {
            return false;
        };
        if !player.alive {
            return false;
        }
        let spec = tuning.weapons.get(player.weapon.kind);
        if !player.weapon.start_reload(now, spec) {
            return false;
        }
        let weapon = player.weapon.clone();
        self.events.push(weapon_changed(entity, &weapon));
        true
    }

    pub(crate) fn pickup(
        &mut self,
        entity: EntityId,
        crate_id: EntityId,
        now: Instant,
    ) -> Result<WeaponKind, PickupRejection> {
        let tuning = Arc::clone(&self.tuning);
        let player = self.world.player(entity).ok_or(PickupRejection::NoPlayer)?;
        if !player.alive {
            return Err(PickupRejection::Dead);
        }
        let position = player.position;

        let pickup = self
            .world
            .pickup_mut(crate_id)
            .ok_or(PickupRejection::UnknownCrate)?;
        if !pickup.available {
            return Err(PickupRejection::Unavailable);
        }
        if pickup.position.distance(position) > tuning.player.pickup_radius {
            return Err(PickupRejection::TooFar);
        }
        pickup.available = false;
        pickup.respawn_at = Some(now + tuning.arena.crate_respawn_delay);
        let kind = pickup.weapon;

        let weapon = WeaponState::new(tuning.weapons.get(kind));
        if let Some(player) = self.world.player_mut(entity) {
            player.weapon = weapon.clone();
        }
        self.events.push(WorldEvent::PickupConfirmed {
            entity,
            crate_id,
            weapon: kind,
            respawn_in: tuning.arena.crate_respawn_delay,
        });
        self.events.push(weapon_changed(entity, &weapon));
        Ok(kind)
    }

    /// Applies damage from `attacker`. Returns true when the hit was lethal.
    pub(crate) fn apply_damage(
        &mut self,
        victim: EntityId,
        attacker: EntityId,
        damage: i32,
        projectile: Option<EntityId>,
        now: Instant,
    ) -> DamageOutcome {
        let kill_xp = self.tuning.player.kill_xp;
        let Some(target) = self.world.player_mut(victim) else {
            return DamageOutcome::Ignored;
        };
        if !target.alive || damage <= 0 {
            return DamageOutcome::Ignored;
        }

        target.health = (target.health - damage).max(0);
        target.last_damage_at = Some(now);
        target.regenerating = false;
        target.regen_accumulator = 0.0;
        let health = target.health;
        self.events.push(WorldEvent::PlayerDamaged {
            victim,
            attacker,
            damage,
            health,
            projectile,
        });
        self.events.push(WorldEvent::HitConfirmed {
            attacker,
            victim,
            damage,
        });
        if health > 0 {
            return DamageOutcome::Wounded;
        }

        target.alive = false;
        target.died_at = Some(now);
        target.deaths += 1;
        target.velocity = Vec2::ZERO;
        target.weapon.cancel_reload();
        if target.roll.take().is_some() {
            self.events.push(WorldEvent::RollEnded {
                entity: victim,
                reason: RollEndReason::Died,
            });
        }

        let killer = match self.world.player_mut(attacker) {
            Some(killer) if attacker != victim => {
                killer.kills += 1;
                killer.xp += kill_xp;
                Some((killer.id, killer.kills, killer.xp))
            }
            _ => None,
        };
        self.events.push(WorldEvent::PlayerDied {
            victim,
            killer: killer.map(|(id, _, _)| id),
        });
        if let Some((killer, kills, xp)) = killer {
            self.events.push(WorldEvent::KillCredit {
                killer,
                victim,
                kills,
                xp,
            });
        }
        DamageOutcome::Killed
    }
}

fn weapon_changed(entity: EntityId, weapon: &WeaponState) -> WorldEvent {
    WorldEvent::WeaponChanged {
        entity,
        weapon: weapon.kind,
        ammo: weapon.ammo,
        magazine_size: weapon.magazine_size,
        reloading: weapon.is_reloading(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InputState;
    use crate::domain::match_rules::MatchRules;
    use crate::domain::tuning::WeaponTable;
    use crate::use_cases::test_support::TestRig;
    use std::time::Duration;

    fn give_weapon(rig: &mut TestRig, id: EntityId, kind: WeaponKind) {
        let spec = rig.sim.tuning.weapons.get(kind).clone();
        rig.player_mut(id).weapon = WeaponState::new(&spec);
    }

    #[test]
    fn fire_rejections_carry_reasons() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        assert_eq!(rig.sim.fire(99, 0.0, rig.now), Err(ShootFailure::NoPlayer));

        rig.sim.fire(id, 0.0, rig.now).expect("first shot");
        assert_eq!(rig.sim.fire(id, 0.0, rig.now), Err(ShootFailure::Cooldown));

        rig.player_mut(id).weapon.ammo = 0;
        rig.advance(Duration::from_secs(1));
        assert_eq!(rig.sim.fire(id, 0.0, rig.now), Err(ShootFailure::Empty));

        rig.player_mut(id).alive = false;
        assert_eq!(rig.sim.fire(id, 0.0, rig.now), Err(ShootFailure::Dead));
    }

    #[test]
    fn last_round_starts_reload() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        rig.player_mut(id).weapon.ammo = 1;
        rig.sim.fire(id, 0.0, rig.now).expect("fires");
        let weapon = &rig.sim.world().player(id).expect("p").weapon;
        assert_eq!(weapon.ammo, 0);
        assert!(weapon.is_reloading());
        rig.advance(Duration::from_secs(1));
        assert_eq!(rig.sim.fire(id, 0.0, rig.now), Err(ShootFailure::Reloading));
    }

    #[test]
    fn shotgun_fans_pellets_across_arc() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        give_weapon(&mut rig, id, WeaponKind::Shotgun);
        let FireOutcome::Projectiles(ids) = rig.sim.fire(id, 0.0, rig.now).expect("fires") else {
            panic!("shotgun spawns projectiles");
        };
        assert_eq!(ids.len(), 8);

        let half_arc = 7.5f32.to_radians();
        let step = 15f32.to_radians() / 7.0;
        for projectile in rig.sim.world().projectiles() {
            let angle = projectile.velocity.angle();
            assert!(angle.abs() <= half_arc + step / 4.0 + 1e-4);
            assert_eq!(projectile.damage, 8);
        }
    }

    #[test]
    fn uzi_recoil_accumulates_then_recovers() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        give_weapon(&mut rig, id, WeaponKind::Uzi);
        let mut angles = Vec::new();
        for _ in 0..4 {
            rig.sim.fire(id, 0.0, rig.now).expect("fires");
            rig.advance(Duration::from_millis(110));
        }
        for projectile in rig.sim.world().projectiles() {
            angles.push(projectile.velocity.angle().to_degrees());
        }
        let expected = [0.0, 2.0, 4.0, 6.0];
        for (angle, want) in angles.iter().zip(expected) {
            assert!((angle - want).abs() < 1e-3, "{angle} vs {want}");
        }

        rig.advance(Duration::from_secs(1));
        rig.sim.fire(id, 0.0, rig.now).expect("fires");
        assert_eq!(rig.sim.world().player(id).expect("p").weapon.burst, 1);
    }

    #[test]
    fn lag_compensated_hitscan_uses_rewound_position() {
        // Target stood at x=600 until 100ms ago, then moved out of the line of fire.
        let mut rig = TestRig::new();
        let shooter = rig.place_player(Vec2::new(100.0, 500.0));
        let target = rig.place_player(Vec2::new(600.0, 500.0));
        give_weapon(&mut rig, shooter, WeaponKind::Ak47);
        rig.player_mut(shooter).rtt = Duration::from_millis(100);

        let moved_at = rig.now + Duration::from_millis(16);
        rig.advance(Duration::from_millis(100));
        rig.sim.history.record(target, Vec2::new(600.0, 500.0), moved_at);
        rig.sim.history.record(target, Vec2::new(600.0, 900.0), rig.now);
        rig.player_mut(target).position = Vec2::new(600.0, 900.0);

        let outcome = rig.sim.fire(shooter, 0.0, rig.now).expect("fires");
        assert_eq!(outcome, FireOutcome::Hitscan { victims: vec![target] });
        assert_eq!(rig.sim.world().player(target).expect("t").health, 80);
    }

    #[test]
    fn hitscan_picks_nearest_body() {
        let mut rig = TestRig::new();
        let shooter = rig.place_player(Vec2::new(100.0, 500.0));
        let far = rig.place_player(Vec2::new(600.0, 500.0));
        let near = rig.place_player(Vec2::new(300.0, 500.0));
        give_weapon(&mut rig, shooter, WeaponKind::Ak47);
        let outcome = rig.sim.fire(shooter, 0.0, rig.now).expect("fires");
        assert_eq!(outcome, FireOutcome::Hitscan { victims: vec![near] });
        assert_eq!(rig.sim.world().player(far).expect("far").health, 100);
    }

    #[test]
    fn hitscan_pellets_after_a_kill_are_not_counted_as_hits() {
        let mut rig = TestRig::new();
        let mut tuning = (*rig.sim.tuning).clone();
        let specs = tuning
            .weapons
            .iter()
            .cloned()
            .map(|mut spec| {
                if spec.kind == WeaponKind::Ak47 {
                    spec.pellets = 3;
                    spec.damage = 300;
                    spec.arc_degrees = 0.0;
                    spec.recoil = None;
                }
                spec
            })
            .collect();
        tuning.weapons = WeaponTable::from_specs(specs).expect("valid table");
        rig.sim.tuning = Arc::new(tuning);

        let shooter = rig.place_player(Vec2::new(100.0, 500.0));
        let target = rig.place_player(Vec2::new(400.0, 500.0));
        give_weapon(&mut rig, shooter, WeaponKind::Ak47);

        let outcome = rig.sim.fire(shooter, 0.0, rig.now).expect("fires");
        assert_eq!(outcome, FireOutcome::Hitscan { victims: vec![target] });
        assert!(!rig.sim.world().player(target).expect("t").alive);
        rig.step(0.0);
        let damaged = rig
            .sink
            .take()
            .iter()
            .filter(|e| matches!(e, WorldEvent::PlayerDamaged { .. }))
            .count();
        assert_eq!(damaged, 1);
    }

    #[test]
    fn attacks_fail_once_the_match_is_over() {
        let mut rig = TestRig::with_rules(MatchRules {
            kill_target: 1,
            time_limit: None,
            ..MatchRules::default()
        });
        let attacker = rig.place_player(Vec2::new(500.0, 500.0));
        let victim = rig.place_player(Vec2::new(540.0, 500.0));
        rig.sim.apply_damage(victim, attacker, 100, None, rig.now);
        rig.step(0.0);
        assert!(rig.sim.is_match_over());

        rig.advance(Duration::from_secs(1));
        assert_eq!(rig.sim.fire(attacker, 0.0, rig.now), Err(ShootFailure::MatchOver));
        give_weapon(&mut rig, attacker, WeaponKind::Katana);
        assert_eq!(rig.sim.melee(attacker, 0.0, rig.now), Err(ShootFailure::MatchOver));
        assert_eq!(rig.sim.world().projectile_count(), 0);
    }

    #[test]
    fn bat_swing_hits_cone_and_knocks_back() {
        let mut rig = TestRig::new();
        let attacker = rig.place_player(Vec2::new(500.0, 500.0));
        let in_range = rig.place_player(Vec2::new(564.0, 500.0));
        let behind = rig.place_player(Vec2::new(440.0, 500.0));
        give_weapon(&mut rig, attacker, WeaponKind::Bat);

        let victims = rig.sim.melee(attacker, 0.0, rig.now).expect("swings");
        assert_eq!(victims, vec![in_range]);
        let hit = rig.sim.world().player(in_range).expect("hit");
        assert_eq!(hit.health, 75);
        assert_eq!(hit.position, Vec2::new(604.0, 500.0));
        assert_eq!(rig.sim.world().player(behind).expect("behind").health, 100);
        assert_eq!(rig.sim.melee(attacker, 0.0, rig.now), Err(ShootFailure::Cooldown));
    }

    #[test]
    fn melee_rejects_ranged_weapons_and_fire_rejects_melee() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        assert_eq!(rig.sim.melee(id, 0.0, rig.now), Err(ShootFailure::NotMelee));
        give_weapon(&mut rig, id, WeaponKind::Katana);
        assert_eq!(rig.sim.fire(id, 0.0, rig.now), Err(ShootFailure::NotRanged));
    }

    #[test]
    fn roll_iframes_block_hits_then_expire() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        rig.player_mut(id).input = InputState { up: true, ..InputState::default() };
        assert!(rig.sim.start_roll(id, rig.now));
        assert_eq!(rig.sim.world().player(id).expect("p").roll.map(|r| r.direction), Some(Vec2::new(0.0, -1.0)));

        let iframes = rig.sim.tuning.roll.iframes;
        assert!(!rig.sim.world().player(id).expect("p").is_hittable(rig.now, iframes));
        rig.advance(Duration::from_millis(200));
        assert!(rig.sim.world().player(id).expect("p").is_hittable(rig.now, iframes));
    }

    #[test]
    fn roll_respects_cooldown_and_uses_aim_when_idle() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        rig.player_mut(id).aim_angle = std::f32::consts::PI;
        assert!(rig.sim.start_roll(id, rig.now));
        let dir = rig.sim.world().player(id).expect("p").roll.expect("rolling").direction;
        assert!((dir.x + 1.0).abs() < 1e-5);

        rig.player_mut(id).roll = None;
        rig.advance(Duration::from_secs(2));
        assert!(!rig.sim.start_roll(id, rig.now));
        rig.advance(Duration::from_secs(1));
        assert!(rig.sim.start_roll(id, rig.now));
    }

    #[test]
    fn pickup_requires_proximity_and_availability() {
        let mut rig = TestRig::new();
        let crate_id = rig.sim.world().pickups().next().map(|p| p.id).expect("crate");
        let crate_pos = rig.sim.world().pickup(crate_id).expect("crate").position;
        let near = rig.place_player(crate_pos + Vec2::new(30.0, 0.0));
        let far = rig.place_player(crate_pos + Vec2::new(33.0, 0.0));

        assert_eq!(rig.sim.pickup(far, crate_id, rig.now), Err(PickupRejection::TooFar));
        assert_eq!(rig.sim.pickup(near, 9_999, rig.now), Err(PickupRejection::UnknownCrate));
        assert!(rig.sim.pickup(near, crate_id, rig.now).is_ok());
        assert_eq!(rig.sim.pickup(near, crate_id, rig.now), Err(PickupRejection::Unavailable));
    }

    #[test]
    fn self_damage_never_credits_a_kill() {
        let mut rig = TestRig::new();
        let id = rig.place_player(Vec2::new(500.0, 500.0));
        assert_eq!(rig.sim.apply_damage(id, id, 500, None, rig.now), DamageOutcome::Killed);
        let player = rig.sim.world().player(id).expect("p");
        assert_eq!((player.kills, player.deaths, player.xp), (0, 1, 0));
        assert_eq!(rig.sim.apply_damage(id, id, 10, None, rig.now), DamageOutcome::Ignored);
    }
}
