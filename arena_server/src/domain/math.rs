// Spatial primitives shared by physics, history and the synchronizer.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Sub};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, 0 = +x, clockwise in screen space).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector, or zero for a zero-length input.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    /// Angle of this vector in radians, in [-PI, PI].
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Replaces non-finite components with zero, logging each replacement.
    pub fn sanitized(self, field: &'static str) -> Self {
        Self::new(sanitize(self.x, field), sanitize(self.y, field))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned region an entity's center may occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Center bounds for a box of `half_extents` that must stay inside a `width` x `height` arena.
    pub fn inset(width: f32, height: f32, half_extents: Vec2) -> Self {
        Self::new(
            half_extents,
            Vec2::new(width - half_extents.x, height - half_extents.y),
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Clamps `point` into the bounds, reporting whether any axis was altered.
    pub fn clamp(&self, point: Vec2) -> (Vec2, bool) {
        let x = point.x.clamp(self.min.x, self.max.x);
        let y = point.y.clamp(self.min.y, self.max.y);
        let clamped = x != point.x || y != point.y;
        (Vec2::new(x, y), clamped)
    }
}

/// Replaces NaN and infinities with 0.0 and logs the violation.
pub fn sanitize(value: f32, field: &'static str) -> f32 {
    if value.is_finite() {
        value
    } else {
        error!(field, value = %value, "non-finite value sanitized to zero");
        0.0
    }
}

/// Wraps an angle in radians into [-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Absolute difference between two angles along the shorter arc, in [0, PI].
pub fn angle_between(a: f32, b: f32) -> f32 {
    wrap_angle(a - b).abs()
}

/// Moves `current` toward `target` by at most `max_delta`.
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}
