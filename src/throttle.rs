//! Throttle gate for local position updates.
//!
//! The render loop may move the local avatar every frame; the network only
//! hears about it when enough time has passed *and* the position actually
//! changed. One boolean check per simulation step, no buffering.

use crate::types::Millis;

/// Last transmitted sample. One per local session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleState {
    /// `None` until the first `mark_sent`, so the first sample is only
    /// subject to the change check.
    pub last_sent_at: Option<Millis>,
    pub last_x: f64,
    pub last_y: f64,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self {
            last_sent_at: None,
            // NaN never compares equal, so any first position counts as a change.
            last_x: f64::NAN,
            last_y: f64::NAN,
        }
    }

    /// True when `interval_ms` has elapsed since the last send and `(x, y)`
    /// differs from the last sent position. Both must hold.
    pub fn should_send_update(&self, x: f64, y: f64, now: Millis, interval_ms: Millis) -> bool {
        let rate_ok = match self.last_sent_at {
            Some(last) => now.saturating_sub(last) >= interval_ms && now >= last,
            None => true,
        };
        let moved = !(x == self.last_x && y == self.last_y);
        rate_ok && moved
    }

    /// Record a transmitted sample.
    pub fn mark_sent(&mut self, x: f64, y: f64, now: Millis) {
        self.last_sent_at = Some(now);
        self.last_x = x;
        self.last_y = y;
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
