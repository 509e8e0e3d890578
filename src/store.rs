//! Application state sink and a reference in-memory store.
//!
//! The session never owns UI state. It pushes every change through the
//! [`StateSink`] trait so a caller can plug in its own model (a game-engine
//! scene, a TUI, a test recorder). [`PresenceStore`] is the plain
//! implementation used by the headless client and the integration tests.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{PeerState, Point};

/// One line of chat history (typed chat or a voice transcript).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Sender's clock as reported on the wire (any number), or the local
    /// receive time when the message carried none.
    pub timestamp: f64,
}

/// Receives state updates from a presence session.
pub trait StateSink {
    fn set_position(&mut self, x: f64, y: f64);
    fn update_peer(&mut self, peer: PeerState);
    fn remove_peer(&mut self, user_id: &str);
    fn set_connected(&mut self, connected: bool);
    fn add_chat_message(&mut self, entry: ChatEntry);
    fn set_identity(&mut self, display_name: String, photo: Option<String>);
    fn set_session_token(&mut self, token: String);
    fn set_current_zone_id(&mut self, zone_id: Option<String>);
}

// ---------------------------------------------------------------------------
// PresenceStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub photo: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PresenceStore {
    pub identity: Identity,
    pub position: Point,
    pub peers: HashMap<String, PeerState>,
    pub connected: bool,
    pub current_zone_id: Option<String>,
    chat: VecDeque<ChatEntry>,
    chat_cap: usize,
}

impl PresenceStore {
    pub const DEFAULT_POSITION: Point = Point { x: 400.0, y: 300.0 };

    pub fn new(chat_cap: usize) -> Self {
        Self {
            identity: Identity::default(),
            position: Self::DEFAULT_POSITION,
            peers: HashMap::new(),
            connected: false,
            current_zone_id: None,
            chat: VecDeque::with_capacity(chat_cap.min(1024)),
            chat_cap,
        }
    }

    /// Oldest first.
    pub fn chat(&self) -> impl Iterator<Item = &ChatEntry> {
        self.chat.iter()
    }

    pub fn chat_len(&self) -> usize {
        self.chat.len()
    }

    pub fn peer(&self, user_id: &str) -> Option<&PeerState> {
        self.peers.get(user_id)
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl StateSink for PresenceStore {
    fn set_position(&mut self, x: f64, y: f64) {
        self.position = Point::new(x, y);
    }

    fn update_peer(&mut self, peer: PeerState) {
        self.peers.insert(peer.user_id.clone(), peer);
    }

    fn remove_peer(&mut self, user_id: &str) {
        self.peers.remove(user_id);
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn add_chat_message(&mut self, entry: ChatEntry) {
        if self.chat_cap == 0 {
            return;
        }
        while self.chat.len() >= self.chat_cap {
            self.chat.pop_front();
        }
        self.chat.push_back(entry);
    }

    fn set_identity(&mut self, display_name: String, photo: Option<String>) {
        self.identity.display_name = display_name;
        self.identity.photo = photo;
    }

    fn set_session_token(&mut self, token: String) {
        self.identity.session_token = Some(token);
    }

    fn set_current_zone_id(&mut self, zone_id: Option<String>) {
        self.current_zone_id = zone_id;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
