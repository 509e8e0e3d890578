//! Linear interpolation for remote avatars.
//!
//! Remote positions arrive at the throttle cadence (~10 Hz) but are drawn
//! every frame. Each peer gets a [`LerpTarget`]: two positions and a time
//! window, evaluated statelessly at render time.

use std::collections::HashMap;

use crate::types::{Millis, Point};

// ---------------------------------------------------------------------------
// Lerp target
// ---------------------------------------------------------------------------

/// Immutable interpolation window. Superseded, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LerpTarget {
    pub from: Point,
    pub to: Point,
    pub start_time: Millis,
    pub duration: Millis,
}

impl LerpTarget {
    pub fn new(from: Point, to: Point, now: Millis, duration_ms: Millis) -> Self {
        Self {
            from,
            to,
            start_time: now,
            duration: duration_ms,
        }
    }

    /// Interpolated position at `now`.
    ///
    /// Exactly `from` before the window opens, exactly `to` once it closes.
    pub fn position_at(&self, now: Millis) -> Point {
        if now < self.start_time {
            return self.from;
        }
        let elapsed = now - self.start_time;
        if elapsed >= self.duration {
            return self.to;
        }

        let t = elapsed as f64 / self.duration as f64;
        Point::new(
            self.from.x + (self.to.x - self.from.x) * t,
            self.from.y + (self.to.y - self.from.y) * t,
        )
    }

    /// New window heading to `to`, starting from wherever this one is at `now`.
    pub fn retarget(&self, to: Point, now: Millis, duration_ms: Millis) -> Self {
        Self::new(self.position_at(now), to, now, duration_ms)
    }

    pub fn is_settled(&self, now: Millis) -> bool {
        now >= self.start_time.saturating_add(self.duration)
    }
}

// ---------------------------------------------------------------------------
// Per-peer table
// ---------------------------------------------------------------------------

/// Lerp targets keyed by peer user id.
#[derive(Debug, Default)]
pub struct PeerMotion {
    targets: HashMap<String, LerpTarget>,
}

impl PeerMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fresh position sample for `user_id`.
    ///
    /// A known peer glides from its current interpolated position; an
    /// unknown peer appears in place.
    pub fn observe(&mut self, user_id: &str, to: Point, now: Millis, duration_ms: Millis) -> LerpTarget {
        let target = match self.targets.get(user_id) {
            Some(prev) => prev.retarget(to, now, duration_ms),
            None => LerpTarget::new(to, to, now, duration_ms),
        };
        self.targets.insert(user_id.to_string(), target);
        target
    }

    pub fn position_of(&self, user_id: &str, now: Millis) -> Option<Point> {
        self.targets.get(user_id).map(|t| t.position_at(now))
    }

    pub fn get(&self, user_id: &str) -> Option<&LerpTarget> {
        self.targets.get(user_id)
    }

    pub fn remove(&mut self, user_id: &str) -> Option<LerpTarget> {
        self.targets.remove(user_id)
    }

    /// Every tracked peer with its interpolated position at `now`.
    pub fn positions(&self, now: Millis) -> impl Iterator<Item = (&str, Point)> + '_ {
        self.targets
            .iter()
            .map(move |(id, t)| (id.as_str(), t.position_at(now)))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> LerpTarget {
        LerpTarget::new(Point::new(0.0, 0.0), Point::new(100.0, 200.0), 1000, 200)
    }

    // ---------------------------------------------------------------
    // Window evaluation
    // ---------------------------------------------------------------

    #[test]
    fn midpoints() {
        let t = target();
        assert_eq!(t.position_at(1100), Point::new(50.0, 100.0));
        assert_eq!(t.position_at(1050), Point::new(25.0, 50.0));
    }

    #[test]
    fn start_is_exactly_from() {
        assert_eq!(target().position_at(1000), Point::new(0.0, 0.0));
    }

    #[test]
    fn before_start_is_from() {
        assert_eq!(target().position_at(0), Point::new(0.0, 0.0));
        assert_eq!(target().position_at(999), Point::new(0.0, 0.0));
    }

    #[test]
    fn end_and_beyond_is_exactly_to() {
        let t = target();
        for now in [1200, 1201, 5000, u64::MAX] {
            assert_eq!(t.position_at(now), Point::new(100.0, 200.0), "now={now}");
        }
    }

    #[test]
    fn zero_distance_is_constant() {
        let t = LerpTarget::new(Point::new(7.0, 7.0), Point::new(7.0, 7.0), 0, 120);
        for now in [0, 30, 60, 119, 120, 500] {
            assert_eq!(t.position_at(now), Point::new(7.0, 7.0));
        }
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let t = LerpTarget::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0), 100, 0);
        assert_eq!(t.position_at(100), Point::new(5.0, 5.0));
        assert_eq!(t.position_at(99), Point::new(0.0, 0.0));
    }

    #[test]
    fn retarget_starts_from_current_position() {
        let t = target();
        let next = t.retarget(Point::new(0.0, 0.0), 1100, 200);
        assert_eq!(next.from, Point::new(50.0, 100.0));
        assert_eq!(next.position_at(1100), Point::new(50.0, 100.0));
        assert_eq!(next.start_time, 1100);
    }

    #[test]
    fn settled_after_window() {
        let t = target();
        assert!(!t.is_settled(1199));
        assert!(t.is_settled(1200));
    }

    // ---------------------------------------------------------------
    // Peer table
    // ---------------------------------------------------------------

    #[test]
    fn first_sample_places_peer_without_motion() {
        let mut m = PeerMotion::new();
        m.observe("u1", Point::new(10.0, 20.0), 0, 120);
        assert_eq!(m.position_of("u1", 0), Some(Point::new(10.0, 20.0)));
        assert_eq!(m.position_of("u1", 60), Some(Point::new(10.0, 20.0)));
    }

    #[test]
    fn second_sample_glides_without_jump() {
        let mut m = PeerMotion::new();
        m.observe("u1", Point::new(0.0, 0.0), 0, 100);
        m.observe("u1", Point::new(100.0, 0.0), 1000, 100);
        // mid-flight re-target keeps continuity
        m.observe("u1", Point::new(100.0, 100.0), 1050, 100);
        assert_eq!(m.position_of("u1", 1050), Some(Point::new(50.0, 0.0)));
        assert_eq!(m.position_of("u1", 1150), Some(Point::new(100.0, 100.0)));
    }

    #[test]
    fn remove_and_unknown() {
        let mut m = PeerMotion::new();
        m.observe("u1", Point::zero(), 0, 100);
        assert_eq!(m.len(), 1);
        assert!(m.remove("u1").is_some());
        assert!(m.is_empty());
        assert_eq!(m.position_of("u1", 0), None);
    }
}
