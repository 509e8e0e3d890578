//! Speech bubble lifecycle.
//!
//! Timed text overlays per speaker: fully visible for `display_ms`, then a
//! linear fade over `fade_ms`, then eligible for removal. Each speaker holds
//! at most `max_per_speaker` bubbles; adding past the cap evicts that
//! speaker's oldest. Removal is pull-based via [`SpeechBubbleManager::cleanup`].

use crate::types::{Millis, PresenceConfig};

pub const DEFAULT_DISPLAY_MS: Millis = 5000;
pub const DEFAULT_FADE_MS: Millis = 2000;
pub const DEFAULT_MAX_PER_SPEAKER: usize = 2;

/// Monotonic per-manager bubble id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u64);

impl std::fmt::Display for BubbleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bubble-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubblePhase {
    Visible,
    Fading,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBubble {
    pub id: BubbleId,
    pub speaker_id: String,
    pub text: String,
    pub created_at: Millis,
    /// `created_at + display_ms`
    pub fade_at: Millis,
    /// `fade_at + fade_ms`
    pub expire_at: Millis,
}

impl SpeechBubble {
    pub fn phase(&self, now: Millis) -> BubblePhase {
        if now < self.fade_at {
            BubblePhase::Visible
        } else if now < self.expire_at {
            BubblePhase::Fading
        } else {
            BubblePhase::Expired
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BubbleOptions {
    pub display_ms: Millis,
    pub fade_ms: Millis,
    pub max_per_speaker: usize,
}

impl Default for BubbleOptions {
    fn default() -> Self {
        Self {
            display_ms: DEFAULT_DISPLAY_MS,
            fade_ms: DEFAULT_FADE_MS,
            max_per_speaker: DEFAULT_MAX_PER_SPEAKER,
        }
    }
}

impl From<&PresenceConfig> for BubbleOptions {
    fn from(config: &PresenceConfig) -> Self {
        Self {
            display_ms: config.bubble_display_ms,
            fade_ms: config.bubble_fade_ms,
            max_per_speaker: config.bubbles_per_speaker,
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SpeechBubbleManager {
    /// Insertion order == creation order.
    bubbles: Vec<SpeechBubble>,
    options: BubbleOptions,
    next_id: u64,
}

impl SpeechBubbleManager {
    /// A cap of zero is treated as one: the bubble being added always survives.
    pub fn new(options: BubbleOptions) -> Self {
        Self {
            bubbles: Vec::new(),
            options: BubbleOptions {
                max_per_speaker: options.max_per_speaker.max(1),
                ..options
            },
            next_id: 0,
        }
    }

    pub fn options(&self) -> BubbleOptions {
        self.options
    }

    /// Add a bubble for `speaker_id`, evicting that speaker's oldest bubbles
    /// first if the cap is reached.
    pub fn add_bubble(&mut self, speaker_id: &str, text: &str, now: Millis) -> &SpeechBubble {
        while self.count_for(speaker_id) >= self.options.max_per_speaker {
            let Some(oldest) = self.bubbles.iter().position(|b| b.speaker_id == speaker_id) else {
                break;
            };
            let evicted = self.bubbles.remove(oldest);
            log::debug!("evicted {} for speaker {}", evicted.id, speaker_id);
        }

        let id = BubbleId(self.next_id);
        self.next_id += 1;

        let fade_at = now.saturating_add(self.options.display_ms);
        self.bubbles.push(SpeechBubble {
            id,
            speaker_id: speaker_id.to_string(),
            text: text.to_string(),
            created_at: now,
            fade_at,
            expire_at: fade_at.saturating_add(self.options.fade_ms),
        });
        &self.bubbles[self.bubbles.len() - 1]
    }

    /// 1.0 while visible, linear ramp to 0.0 while fading, 0.0 once expired.
    pub fn opacity(&self, bubble: &SpeechBubble, now: Millis) -> f64 {
        match bubble.phase(now) {
            BubblePhase::Visible => 1.0,
            BubblePhase::Expired => 0.0,
            BubblePhase::Fading => {
                let progress = (now - bubble.fade_at) as f64 / self.options.fade_ms as f64;
                1.0 - progress
            }
        }
    }

    /// Remove every bubble with `now >= expire_at`, returning their ids.
    pub fn cleanup(&mut self, now: Millis) -> Vec<BubbleId> {
        let mut removed = Vec::new();
        self.bubbles.retain(|b| {
            if now >= b.expire_at {
                removed.push(b.id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn get_all(&self) -> &[SpeechBubble] {
        &self.bubbles
    }

    pub fn get_by_speaker(&self, speaker_id: &str) -> Vec<&SpeechBubble> {
        self.bubbles.iter().filter(|b| b.speaker_id == speaker_id).collect()
    }

    /// Drop every bubble belonging to `speaker_id` (e.g. on disconnect).
    pub fn remove_speaker(&mut self, speaker_id: &str) {
        self.bubbles.retain(|b| b.speaker_id != speaker_id);
    }

    pub fn clear(&mut self) {
        self.bubbles.clear();
    }

    pub fn count(&self) -> usize {
        self.bubbles.len()
    }

    fn count_for(&self, speaker_id: &str) -> usize {
        self.bubbles.iter().filter(|b| b.speaker_id == speaker_id).count()
    }
}

impl Default for SpeechBubbleManager {
    fn default() -> Self {
        Self::new(BubbleOptions::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(display_ms: Millis, fade_ms: Millis, max_per_speaker: usize) -> SpeechBubbleManager {
        SpeechBubbleManager::new(BubbleOptions {
            display_ms,
            fade_ms,
            max_per_speaker,
        })
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    #[test]
    fn adds_a_bubble() {
        let mut m = SpeechBubbleManager::default();
        let b = m.add_bubble("speaker-1", "Hello!", 1000).clone();
        assert_eq!(b.speaker_id, "speaker-1");
        assert_eq!(b.text, "Hello!");
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut m = SpeechBubbleManager::default();
        let a = m.add_bubble("s1", "a", 1000).id;
        let b = m.add_bubble("s2", "b", 1000).id;
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), "bubble-0");
    }

    #[test]
    fn timing_fields() {
        let mut m = manager(5000, 2000, 2);
        let b = m.add_bubble("s1", "test", 1000);
        assert_eq!(b.created_at, 1000);
        assert_eq!(b.fade_at, 6000);
        assert_eq!(b.expire_at, 8000);
    }

    // ---------------------------------------------------------------
    // Opacity
    // ---------------------------------------------------------------

    #[test]
    fn opacity_full_while_visible() {
        let mut m = manager(5000, 2000, 2);
        let b = m.add_bubble("s1", "test", 1000).clone();
        assert_eq!(m.opacity(&b, 1000), 1.0);
        assert_eq!(m.opacity(&b, 5999), 1.0);
        assert_eq!(b.phase(5999), BubblePhase::Visible);
    }

    #[test]
    fn opacity_ramps_while_fading() {
        let mut m = manager(5000, 2000, 2);
        let b = m.add_bubble("s1", "test", 1000).clone();
        assert_eq!(m.opacity(&b, 6000), 1.0);
        assert!((m.opacity(&b, 7000) - 0.5).abs() < 1e-9);
        assert!((m.opacity(&b, 7500) - 0.25).abs() < 1e-9);
        assert_eq!(b.phase(7000), BubblePhase::Fading);
    }

    #[test]
    fn opacity_zero_once_expired() {
        let mut m = manager(5000, 2000, 2);
        let b = m.add_bubble("s1", "test", 1000).clone();
        assert_eq!(m.opacity(&b, 8000), 0.0);
        assert_eq!(m.opacity(&b, 9000), 0.0);
        assert_eq!(b.phase(8000), BubblePhase::Expired);
    }

    // ---------------------------------------------------------------
    // Cleanup
    // ---------------------------------------------------------------

    #[test]
    fn cleanup_removes_expired_only() {
        let mut m = manager(1000, 500, 2);
        let first = m.add_bubble("s1", "a", 0).id;
        m.add_bubble("s2", "b", 500);

        let removed = m.cleanup(1500);
        assert_eq!(removed, vec![first]);
        assert_eq!(m.count(), 1);
        assert!(m.cleanup(1999).is_empty());
        assert_eq!(m.cleanup(2000).len(), 1);
        assert_eq!(m.count(), 0);
    }

    // ---------------------------------------------------------------
    // Per-speaker cap
    // ---------------------------------------------------------------

    #[test]
    fn third_bubble_evicts_first_of_that_speaker() {
        let mut m = manager(5000, 2000, 2);
        let b1 = m.add_bubble("s1", "first", 0).id;
        let other = m.add_bubble("s2", "other", 50).id;
        let b2 = m.add_bubble("s1", "second", 100).id;
        let b3 = m.add_bubble("s1", "third", 200).id;

        let ids: Vec<_> = m.get_all().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![other, b2, b3]);
        assert!(!ids.contains(&b1));
    }

    #[test]
    fn cap_does_not_touch_other_speakers() {
        let mut m = manager(5000, 2000, 1);
        m.add_bubble("s1", "hello", 0);
        m.add_bubble("s2", "world", 100);
        assert_eq!(m.count(), 2);
    }

    #[test]
    fn zero_cap_behaves_as_one() {
        let mut m = manager(5000, 2000, 0);
        m.add_bubble("s1", "a", 0);
        m.add_bubble("s1", "b", 1);
        assert_eq!(m.count(), 1);
        assert_eq!(m.get_all()[0].text, "b");
    }

    // ---------------------------------------------------------------
    // Introspection / removal
    // ---------------------------------------------------------------

    #[test]
    fn by_speaker_remove_speaker_and_clear() {
        let mut m = SpeechBubbleManager::default();
        m.add_bubble("s1", "a", 0);
        m.add_bubble("s2", "b", 0);
        m.add_bubble("s1", "c", 0);
        assert_eq!(m.get_by_speaker("s1").len(), 2);

        m.remove_speaker("s1");
        assert_eq!(m.count(), 1);
        assert!(m.get_by_speaker("s1").is_empty());

        m.clear();
        assert_eq!(m.count(), 0);
    }
}
