// Canonical entity tables for one simulated match.

use crate::domain::entities::{EntityId, Pickup, Player, Projectile};
use crate::domain::math::Vec2;
use crate::domain::tuning::WeaponKind;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct World {
    players: BTreeMap<EntityId, Player>,
    projectiles: BTreeMap<EntityId, Projectile>,
    pickups: BTreeMap<EntityId, Pickup>,
    next_id: EntityId,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Ids are never reused within one world.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Removes a player and every projectile it still owns.
    pub fn remove_player(&mut self, id: EntityId) -> Option<(Player, Vec<EntityId>)> {
        let player = self.players.remove(&id)?;
        let owned: Vec<EntityId> = self
            .projectiles
            .values()
            .filter(|p| p.owner_id == id)
            .map(|p| p.id)
            .collect();
        for projectile_id in &owned {
            self.projectiles.remove(projectile_id);
        }
        Some((player, owned))
    }

    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Players in ascending id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.keys().copied().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn insert_projectile(&mut self, projectile: Projectile) {
        self.projectiles.insert(projectile.id, projectile);
    }

    pub fn remove_projectile(&mut self, id: EntityId) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    pub fn projectile_mut(&mut self, id: EntityId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(&id)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn add_pickup(&mut self, position: Vec2, weapon: WeaponKind) -> EntityId {
        let id = self.allocate_id();
        self.pickups.insert(
            id,
            Pickup {
                id,
                position,
                weapon,
                available: true,
                respawn_at: None,
            },
        );
        id
    }

    pub fn pickup(&self, id: EntityId) -> Option<&Pickup> {
        self.pickups.get(&id)
    }

    pub fn pickup_mut(&mut self, id: EntityId) -> Option<&mut Pickup> {
        self.pickups.get_mut(&id)
    }

    pub fn pickups(&self) -> impl Iterator<Item = &Pickup> {
        self.pickups.values()
    }

    pub fn pickups_mut(&mut self) -> impl Iterator<Item = &mut Pickup> {
        self.pickups.values_mut()
    }

    /// Copies the transmittable state of every entity.
    pub fn view(&self, tick: u64) -> WorldView {
        WorldView {
            tick,
            players: self.players.values().map(PlayerView::from).collect(),
            projectiles: self.projectiles.values().map(ProjectileView::from).collect(),
            pickups: self.pickups.values().map(PickupView::from).collect(),
            sequences: self
                .players
                .values()
                .filter_map(|p| p.last_applied_sequence.map(|seq| (p.id, seq)))
                .collect(),
        }
    }
}

/// Owned copy of the world taken at a tick boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldView {
    pub tick: u64,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<ProjectileView>,
    pub pickups: Vec<PickupView>,
    /// Highest applied input sequence per player.
    pub sequences: BTreeMap<EntityId, u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f32,
    pub health: i32,
    pub alive: bool,
    pub invulnerable: bool,
    pub rolling: bool,
    pub regenerating: bool,
    pub sprinting: bool,
    pub weapon: WeaponKind,
    pub ammo: u32,
    pub reloading: bool,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            position: p.position,
            velocity: p.velocity,
            aim_angle: p.aim_angle,
            health: p.health,
            alive: p.alive,
            invulnerable: p.invulnerable,
            rolling: p.is_rolling(),
            regenerating: p.regenerating,
            sprinting: p.input.sprint,
            weapon: p.weapon.kind,
            ammo: p.weapon.ammo,
            reloading: p.weapon.is_reloading(),
            kills: p.kills,
            deaths: p.deaths,
            xp: p.xp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileView {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub weapon: WeaponKind,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl From<&Projectile> for ProjectileView {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            weapon: p.weapon,
            position: p.position,
            velocity: p.velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupView {
    pub id: EntityId,
    pub position: Vec2,
    pub weapon: WeaponKind,
    pub available: bool,
}

impl From<&Pickup> for PickupView {
    fn from(p: &Pickup) -> Self {
        Self {
            id: p.id,
            position: p.position,
            weapon: p.weapon,
            available: p.available,
        }
    }
}
