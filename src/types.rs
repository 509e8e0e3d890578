//! Core presence types shared across all modules.

use serde::{Deserialize, Serialize};

use crate::zones::ZoneBounds;

/// Milliseconds on whichever clock the caller drives the session with.
///
/// Every timing function takes an explicit `now: Millis` so tests can run
/// against a fabricated clock.
pub type Millis = u64;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// A remote user as last reported by a `presence` message.
///
/// Produced by the session, owned by whatever [`StateSink`](crate::store::StateSink)
/// the caller supplies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerState {
    pub user_id: String,
    pub display_name: String,
    pub photo: Option<String>,
    pub x: f64,
    pub y: f64,
    pub zone_id: String,
    pub space_id: String,
    /// Local clock reading when the presence sample was applied.
    pub last_updated: Millis,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Minimum spacing between outbound `position` messages (100 ms = 10 Hz).
    pub update_interval_ms: Millis,
    /// Interpolation window for remote avatars. Slightly longer than the
    /// update interval so motion never stalls between samples.
    pub lerp_duration_ms: Millis,
    /// How long a speech bubble stays fully opaque.
    pub bubble_display_ms: Millis,
    /// Length of the linear fade that follows the display phase.
    pub bubble_fade_ms: Millis,
    /// Live bubbles kept per speaker before the oldest is evicted.
    pub bubbles_per_speaker: usize,
    /// Chat history entries retained by the reference store.
    pub chat_history_cap: usize,
    pub scene_width: f64,
    pub scene_height: f64,
    /// Name announced in the `identity` message sent on connect.
    pub display_name: String,
    pub photo: Option<String>,
    /// Space id carried by zone join/leave messages.
    pub space_id: String,
    /// Zones in priority order (first match wins).
    pub zones: Vec<ZoneBounds>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 100,
            lerp_duration_ms: 120,
            bubble_display_ms: 5000,
            bubble_fade_ms: 2000,
            bubbles_per_speaker: 2,
            chat_history_cap: 100,
            scene_width: 1600.0,
            scene_height: 1200.0,
            display_name: String::new(),
            photo: None,
            space_id: "cafe".into(),
            zones: Vec::new(),
        }
    }
}
