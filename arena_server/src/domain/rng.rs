// Gameplay randomness (spread, pellet jitter, spawn candidates).
//
// Lives behind its own lock so drawing a number never contends with the world lock.

use crate::domain::math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
pub struct GameRng {
    inner: Mutex<StdRng>,
}

impl GameRng {
    pub fn from_os_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic stream for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Uniform value in [-magnitude, magnitude].
    pub fn symmetric(&self, magnitude: f32) -> f32 {
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return 0.0;
        }
        self.with(|rng| rng.random_range(-magnitude..=magnitude))
    }

    /// Uniform point inside the rectangle spanned by `min` and `max`.
    pub fn point_in(&self, min: Vec2, max: Vec2) -> Vec2 {
        self.with(|rng| {
            let x = if max.x > min.x {
                rng.random_range(min.x..=max.x)
            } else {
                min.x
            };
            let y = if max.y > min.y {
                rng.random_range(min.y..=max.y)
            } else {
                min.y
            };
            Vec2::new(x, y)
        })
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_os_entropy()
    }
}
