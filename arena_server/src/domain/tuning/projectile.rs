/// Gameplay tuning for projectiles shared by every ranged weapon.
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Lifetime before the projectile is despawned regardless of range.
    pub life_time: Duration,

    /// Collision radius in pixels.
    pub radius: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            life_time: Duration::from_secs(1),
            radius: 4.0,
        }
    }
}
