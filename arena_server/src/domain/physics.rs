// Motion integration and hit geometry. Pure functions over domain values.

use crate::domain::entities::{EntityId, InputState};
use crate::domain::math::{Bounds, Vec2, angle_between, approach, sanitize};
use crate::domain::tuning::{ArenaTuning, PlayerTuning};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec2,
    pub velocity: Vec2,
    /// True when the arena edge altered the trajectory.
    pub clamped: bool,
}

/// `clamp(position + velocity * dt, bounds)`. Velocity along a clamped axis is zeroed.
pub fn integrate(position: Vec2, velocity: Vec2, dt: f32, bounds: &Bounds) -> Motion {
    let position = position.sanitized("position");
    let velocity = velocity.sanitized("velocity");
    let dt = sanitize(dt, "dt").max(0.0);

    let target = position + velocity * dt;
    let (clamped_position, clamped) = bounds.clamp(target);
    let mut velocity = velocity;
    if clamped_position.x != target.x {
        velocity.x = 0.0;
    }
    if clamped_position.y != target.y {
        velocity.y = 0.0;
    }

    Motion {
        position: clamped_position,
        velocity,
        clamped,
    }
}

/// Area a player's center may occupy so the bounding box stays inside the arena.
pub fn player_bounds(arena: &ArenaTuning, player: &PlayerTuning) -> Bounds {
    Bounds::inset(
        arena.width,
        arena.height,
        Vec2::new(player.width / 2.0, player.height / 2.0),
    )
}

pub fn arena_bounds(arena: &ArenaTuning) -> Bounds {
    Bounds::new(Vec2::ZERO, Vec2::new(arena.width, arena.height))
}

/// Accelerates toward the input's target velocity, or decelerates to rest without input.
pub fn steer_velocity(current: Vec2, input: &InputState, tuning: &PlayerTuning, dt: f32) -> Vec2 {
    let current = current.sanitized("velocity");
    let dt = sanitize(dt, "dt").max(0.0);
    let direction = input.direction();

    if direction == Vec2::ZERO {
        let step = tuning.deceleration * dt;
        return Vec2::new(approach(current.x, 0.0, step), approach(current.y, 0.0, step));
    }

    let speed = if input.sprint {
        tuning.sprint_speed
    } else {
        tuning.move_speed
    };
    let target = direction * speed;
    let step = tuning.acceleration * dt;
    Vec2::new(
        approach(current.x, target.x, step),
        approach(current.y, target.y, step),
    )
}

/// Axis-aligned rectangle centered on an entity position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Vec2,
    pub half: Vec2,
}

impl Rect {
    pub fn player(center: Vec2, tuning: &PlayerTuning) -> Self {
        Self {
            center,
            half: Vec2::new(tuning.width / 2.0, tuning.height / 2.0),
        }
    }

    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.center.x - self.half.x, self.center.x + self.half.x),
            point.y.clamp(self.center.y - self.half.y, self.center.y + self.half.y),
        )
    }
}

/// Closest-point test: a hit iff distance² from the rect to the circle center is below r².
pub fn circle_hits_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let center = center.sanitized("projectile position");
    let closest = rect.closest_point(center);
    center.distance_squared(closest) < radius * radius
}

/// Distance along the ray to the first intersection with `rect`, if within `range`.
pub fn ray_hits_rect(origin: Vec2, angle: f32, range: f32, rect: &Rect) -> Option<f32> {
    let dir = Vec2::from_angle(sanitize(angle, "aim angle"));
    let min = rect.center - rect.half;
    let max = rect.center + rect.half;

    let mut t_near = 0.0f32;
    let mut t_far = range;
    for (o, d, lo, hi) in [
        (origin.x, dir.x, min.x, max.x),
        (origin.y, dir.y, min.y, max.y),
    ] {
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}

/// A melee candidate as seen by the resolver. `hittable` folds in every exclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeCandidate {
    pub id: EntityId,
    pub position: Vec2,
    pub hittable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeSwing {
    pub attacker: EntityId,
    pub origin: Vec2,
    pub facing: f32,
    pub range: f32,
    pub arc_degrees: f32,
}

/// Targets inside range and half-arc, evaluated in ascending id order.
pub fn melee_targets(swing: &MeleeSwing, candidates: &[MeleeCandidate]) -> Vec<EntityId> {
    let facing = sanitize(swing.facing, "melee facing");
    let half_arc = (swing.arc_degrees / 2.0).to_radians();

    let mut ordered: Vec<&MeleeCandidate> = candidates.iter().collect();
    ordered.sort_by_key(|c| c.id);

    ordered
        .into_iter()
        .filter(|c| c.id != swing.attacker && c.hittable)
        .filter(|c| {
            let offset = c.position - swing.origin;
            if offset.length() > swing.range {
                return false;
            }
            offset == Vec2::ZERO || angle_between(offset.angle(), facing) <= half_arc
        })
        .map(|c| c.id)
        .collect()
}

/// Pushes `target` away from `origin` by `distance`, kept inside `bounds`.
pub fn knockback(origin: Vec2, target: Vec2, distance: f32, bounds: &Bounds) -> Vec2 {
    let dir = (target - origin).normalized();
    if dir == Vec2::ZERO {
        return target;
    }
    bounds.clamp(target + dir * distance).0
}
