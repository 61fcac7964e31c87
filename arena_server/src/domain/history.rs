// Per-entity position history used for lag-compensated hit validation.

use crate::domain::entities::EntityId;
use crate::domain::math::Vec2;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// One second of samples at 60 Hz.
pub const HISTORY_CAPACITY: usize = 60;

/// Hard ceiling on how far back a hit query may rewind.
pub const MAX_REWIND: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub position: Vec2,
    pub at: Instant,
}

/// Fixed-capacity ring of strictly time-ordered samples.
#[derive(Debug, Clone)]
pub struct PositionRing {
    samples: VecDeque<PositionSample>,
    capacity: usize,
}

impl PositionRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Appends a sample, evicting the oldest once full. Non-increasing times are rejected.
    pub fn push(&mut self, sample: PositionSample) -> bool {
        if self.samples.back().is_some_and(|last| sample.at <= last.at) {
            return false;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<&PositionSample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Interpolated position at `at`, or `None` outside [oldest, newest].
    pub fn position_at(&self, at: Instant) -> Option<Vec2> {
        let oldest = self.oldest()?;
        let newest = self.newest()?;
        if at < oldest.at || at > newest.at {
            return None;
        }

        // First sample strictly after `at`; its predecessor brackets from below.
        let upper = self.samples.partition_point(|s| s.at <= at);
        if upper == 0 {
            return Some(oldest.position);
        }
        let before = self.samples[upper - 1];
        let Some(after) = self.samples.get(upper) else {
            return Some(before.position);
        };

        let span = after.at.duration_since(before.at).as_secs_f64();
        let t = if span > 0.0 {
            at.duration_since(before.at).as_secs_f64() / span
        } else {
            0.0
        };
        Some(before.position.lerp(after.position, t as f32))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    rings: HashMap<EntityId, PositionRing>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: EntityId, position: Vec2, at: Instant) {
        let ring = self
            .rings
            .entry(id)
            .or_insert_with(|| PositionRing::with_capacity(HISTORY_CAPACITY));
        if !ring.push(PositionSample { position, at }) {
            debug!(entity_id = id, "out-of-order position sample ignored");
        }
    }

    pub fn query(&self, id: EntityId, at: Instant) -> Option<Vec2> {
        self.rings.get(&id)?.position_at(at)
    }

    /// Position used for hit validation at `at`, falling back to `current`.
    ///
    /// Times after the newest sample mean no rewind is needed. Times older than the
    /// horizon are an invariant violation and are logged.
    pub fn rewound_position(&self, id: EntityId, at: Instant, current: Vec2) -> Vec2 {
        let Some(ring) = self.rings.get(&id) else {
            return current;
        };
        if let Some(position) = ring.position_at(at) {
            return position;
        }
        if ring.newest().is_some_and(|newest| at > newest.at) {
            return current;
        }
        error!(entity_id = id, "rewind query outside history horizon; using current position");
        current
    }

    pub fn remove(&mut self, id: EntityId) {
        self.rings.remove(&id);
    }

    pub fn clear(&mut self, id: EntityId) {
        if let Some(ring) = self.rings.get_mut(&id) {
            *ring = PositionRing::with_capacity(HISTORY_CAPACITY);
        }
    }

    pub fn samples(&self, id: EntityId) -> usize {
        self.rings.get(&id).map_or(0, PositionRing::len)
    }
}

/// Clamps a reported round-trip time to the rewind ceiling.
pub fn rewind_window(rtt: Duration) -> Duration {
    rtt.min(MAX_REWIND)
}

/// Instant the world is rewound to for a request arriving at `now`.
pub fn rewind_target(now: Instant, rtt: Duration) -> Instant {
    now.checked_sub(rewind_window(rtt)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn query_interpolates_between_bracketing_samples() {
        let t0 = Instant::now();
        let mut history = PositionHistory::new();
        history.record(1, Vec2::new(0.0, 0.0), t0);
        history.record(1, Vec2::new(100.0, 0.0), ms(t0, 100));

        let mid = history.query(1, ms(t0, 50)).expect("inside horizon");
        assert!((mid.x - 50.0).abs() < 1e-3);
        assert_eq!(mid.y, 0.0);
        assert_eq!(history.query(1, t0), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(history.query(1, ms(t0, 100)), Some(Vec2::new(100.0, 0.0)));
    }

    #[test]
    fn query_outside_horizon_is_unavailable() {
        let t0 = Instant::now();
        let mut history = PositionHistory::new();
        history.record(1, Vec2::ZERO, ms(t0, 10));
        history.record(1, Vec2::new(10.0, 0.0), ms(t0, 20));
        assert_eq!(history.query(1, t0), None);
        assert_eq!(history.query(1, ms(t0, 21)), None);
        assert_eq!(history.query(2, ms(t0, 15)), None);
    }

    #[test]
    fn ring_evicts_oldest_when_full() {
        let t0 = Instant::now();
        let mut history = PositionHistory::new();
        for i in 0..(HISTORY_CAPACITY as u64 + 5) {
            history.record(1, Vec2::new(i as f32, 0.0), ms(t0, i * 16));
        }
        assert_eq!(history.samples(1), HISTORY_CAPACITY);
        assert_eq!(history.query(1, ms(t0, 0)), None);
        assert_eq!(history.query(1, ms(t0, 5 * 16)), Some(Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn samples_stay_strictly_ordered() {
        let t0 = Instant::now();
        let mut ring = PositionRing::with_capacity(4);
        assert!(ring.push(PositionSample { position: Vec2::ZERO, at: ms(t0, 10) }));
        assert!(!ring.push(PositionSample { position: Vec2::ZERO, at: ms(t0, 10) }));
        assert!(!ring.push(PositionSample { position: Vec2::ZERO, at: ms(t0, 5) }));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn interpolation_stays_within_convex_hull() {
        let t0 = Instant::now();
        let mut history = PositionHistory::new();
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(30.0, 10.0),
            Vec2::new(-20.0, 40.0),
            Vec2::new(5.0, -5.0),
        ];
        for (i, p) in points.iter().enumerate() {
            history.record(7, *p, ms(t0, i as u64 * 16));
        }
        for step in 0..=48 {
            let at = ms(t0, step);
            let pos = history.query(7, at).expect("inside horizon");
            let seg = (step / 16) as usize;
            let (a, b) = (points[seg], points[(seg + 1).min(points.len() - 1)]);
            let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
            let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
            assert!(pos.x >= min_x - 1e-3 && pos.x <= max_x + 1e-3, "step {step}");
            assert!(pos.y >= min_y - 1e-3 && pos.y <= max_y + 1e-3, "step {step}");
        }
    }

    #[test]
    fn rewind_is_clamped_to_ceiling() {
        let now = Instant::now() + Duration::from_secs(1);
        assert_eq!(rewind_window(Duration::from_millis(400)), MAX_REWIND);
        assert_eq!(rewind_window(Duration::from_millis(80)), Duration::from_millis(80));
        let target = rewind_target(now, Duration::from_millis(400));
        assert_eq!(now.duration_since(target), MAX_REWIND);
        for rtt in [0u64, 50, 150, 151, 1_000, 60_000] {
            let target = rewind_target(now, Duration::from_millis(rtt));
            assert!(target >= now - MAX_REWIND);
        }
    }

    #[test]
    fn rewound_position_falls_back_to_current() {
        let t0 = Instant::now();
        let mut history = PositionHistory::new();
        history.record(1, Vec2::new(10.0, 0.0), ms(t0, 100));
        history.record(1, Vec2::new(20.0, 0.0), ms(t0, 116));
        let current = Vec2::new(25.0, 0.0);
        assert_eq!(history.rewound_position(1, ms(t0, 200), current), current);
        assert_eq!(history.rewound_position(1, ms(t0, 50), current), current);
        assert_eq!(history.rewound_position(9, ms(t0, 110), current), current);
        let rewound = history.rewound_position(1, ms(t0, 108), current);
        assert!((rewound.x - 15.0).abs() < 1e-3);
    }
}
