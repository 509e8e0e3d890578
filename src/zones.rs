//! Zone lookup and membership transitions.
//!
//! Zones are axis-aligned, half-open rectangles `[x, x+w) × [y, y+h)`.
//! Overlaps are allowed; the caller's ordering decides (first match wins).

use serde::{Deserialize, Serialize};

/// A named rectangular region of the scene. Static per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Display colour, opaque to the core (e.g. `0x4ecdc4`).
    #[serde(default)]
    pub color: u32,
}

impl ZoneBounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// First zone in `zones` containing `(x, y)`, if any.
pub fn find_zone_at_position(x: f64, y: f64, zones: &[ZoneBounds]) -> Option<&ZoneBounds> {
    zones.iter().find(|z| z.contains(x, y))
}

/// Result of comparing the previous and current zone ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneTransition {
    pub entered: Option<String>,
    pub left: Option<String>,
}

impl ZoneTransition {
    pub fn is_change(&self) -> bool {
        self.entered.is_some() || self.left.is_some()
    }
}

/// Pure diff of two zone ids. `None` means "no zone".
pub fn detect_zone_transition(prev: Option<&str>, current: Option<&str>) -> ZoneTransition {
    if prev == current {
        return ZoneTransition::default();
    }
    ZoneTransition {
        entered: current.map(str::to_string),
        left: prev.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Remembers the current zone so callers only have to feed positions.
///
/// Drive it once per confirmed position tick, not per render frame, or
/// join/leave pairs get emitted twice.
#[derive(Debug, Clone, Default)]
pub struct ZoneTracker {
    current: Option<String>,
}

impl ZoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn update(&mut self, x: f64, y: f64, zones: &[ZoneBounds]) -> ZoneTransition {
        let next = find_zone_at_position(x, y, zones).map(|z| z.id.as_str());
        let transition = detect_zone_transition(self.current.as_deref(), next);
        if transition.is_change() {
            self.current = next.map(str::to_string);
        }
        transition
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
