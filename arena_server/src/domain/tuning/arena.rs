use super::weapons::WeaponKind;
use crate::domain::math::Vec2;
use std::time::Duration;

/// Arena geometry and pickup placement.
#[derive(Debug, Clone)]
pub struct ArenaTuning {
    pub width: f32,
    pub height: f32,

    /// Distance kept from the arena edge when choosing spawn points.
    pub spawn_margin: f32,

    /// Random candidates evaluated per spawn; the one farthest from enemies wins.
    pub spawn_candidates: usize,

    /// Weapon crates placed when the world is created.
    pub crates: Vec<(Vec2, WeaponKind)>,

    pub crate_respawn_delay: Duration,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        let (w, h) = (1920.0, 1080.0);
        Self {
            width: w,
            height: h,
            spawn_margin: 100.0,
            spawn_candidates: 10,
            crates: vec![
                (Vec2::new(w / 2.0, h / 2.0), WeaponKind::Uzi),
                (Vec2::new(w / 4.0, h / 4.0), WeaponKind::Ak47),
                (Vec2::new(3.0 * w / 4.0, h / 4.0), WeaponKind::Shotgun),
                (Vec2::new(w / 4.0, 3.0 * h / 4.0), WeaponKind::Katana),
                (Vec2::new(3.0 * w / 4.0, 3.0 * h / 4.0), WeaponKind::Bat),
            ],
            crate_respawn_delay: Duration::from_secs(30),
        }
    }
}
