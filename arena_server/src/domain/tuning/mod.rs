// Gameplay tuning tables. Read-only once the world is constructed.

pub mod arena;
pub mod player;
pub mod projectile;
pub mod weapons;

pub use arena::ArenaTuning;
pub use player::{PlayerTuning, RollTuning};
pub use projectile::ProjectileTuning;
pub use weapons::{RecoilSpec, WeaponKind, WeaponSpec, WeaponTable};

/// Every tuning table a world needs, bundled so it can be shared behind one `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub roll: RollTuning,
    pub projectile: ProjectileTuning,
    pub weapons: WeaponTable,
}
