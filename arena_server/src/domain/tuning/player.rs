/// Gameplay tuning for player-controlled fighters.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Top walking speed in pixels per second.
    pub move_speed: f32,

    /// Top speed while the sprint modifier is held.
    pub sprint_speed: f32,

    /// Velocity gained per second while input is held (px/s²).
    pub acceleration: f32,

    /// Velocity lost per second with no directional input (px/s²).
    pub deceleration: f32,

    /// Bounding rectangle width in pixels, centered on the player position.
    pub width: f32,

    /// Bounding rectangle height in pixels.
    pub height: f32,

    pub max_health: i32,

    /// Time between death and respawn eligibility.
    pub respawn_delay: Duration,

    /// Hit immunity granted after every (re)spawn.
    pub spawn_invulnerability: Duration,

    /// Time without damage before health starts regenerating.
    pub regen_delay: Duration,

    /// Health regained per second once regeneration is active.
    pub regen_per_second: f32,

    /// XP awarded to the attacker for a kill.
    pub kill_xp: u32,

    /// Max distance between player and crate centers for a pickup.
    pub pickup_radius: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 200.0,
            sprint_speed: 300.0,
            acceleration: 50.0,
            deceleration: 50.0,
            width: 32.0,
            height: 64.0,
            max_health: 100,
            respawn_delay: Duration::from_secs(3),
            spawn_invulnerability: Duration::from_secs(2),
            regen_delay: Duration::from_secs(5),
            regen_per_second: 10.0,
            kill_xp: 100,
            pickup_radius: 32.0,
        }
    }
}

/// Dodge roll tuning.
#[derive(Debug, Clone, Copy)]
pub struct RollTuning {
    pub duration: Duration,

    /// Leading portion of the roll during which hits are ignored.
    pub iframes: Duration,

    pub speed: f32,

    /// Minimum time between roll starts.
    pub cooldown: Duration,
}

impl Default for RollTuning {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(400),
            iframes: Duration::from_millis(200),
            speed: 250.0,
            cooldown: Duration::from_secs(3),
        }
    }
}
