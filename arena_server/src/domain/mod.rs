// Domain layer: core simulation types and rules.

pub mod entities;
pub mod events;
pub mod history;
pub mod match_rules;
pub mod math;
pub mod physics;
pub mod ports;
pub mod rng;
pub mod tuning;
pub mod world;

pub use entities::{EntityId, InputCommand, InputState, Pickup, Player, Projectile, WeaponState};
pub use events::{Audience, EventSink, WorldEvent};
pub use math::Vec2;
pub use world::{PickupView, PlayerView, ProjectileView, World, WorldView};
