//! Presence session: the per-connection context tying the pieces together.
//!
//! ```text
//!   caller loop                     PresenceSession
//!  ─────────────                   ─────────────────────────────────────────
//!   poll(now) ───────────────────▶ Dispatcher::poll ─▶ handle_* (SessionState)
//!                                      │                  ├─ PeerMotion (lerp)
//!                                      │                  ├─ SpeechBubbleManager
//!                                      │                  └─ StateSink
//!                                      └─ LinkEvent ─▶ connected / identity
//!   tick(x, y, now) ─────────────▶ ThrottleState ─▶ position ─▶ ZoneTracker
//!                                                               └─ zone:leave / zone:join
//! ```
//!
//! All state lives here rather than in globals, so several sessions can run
//! side by side (e.g. one per simulated user in a load test). Nothing in
//! this module reads a clock; every entry point takes `now`.

use serde::{Deserialize, Serialize};

use crate::dispatcher::{Dispatcher, LinkEvent};
use crate::lerp::PeerMotion;
use crate::protocol::{MessageType, WireMessage};
use crate::speech_bubble::{BubbleId, BubbleOptions, SpeechBubble, SpeechBubbleManager};
use crate::store::{ChatEntry, StateSink};
use crate::throttle::ThrottleState;
use crate::transport::Transport;
use crate::types::{Millis, PeerState, Point, PresenceConfig};
use crate::zones::{ZoneTracker, ZoneTransition};

/// Name announced when the configured display name is empty.
pub const ANONYMOUS: &str = "Anonymous";

/// The last `error` message the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    pub code: String,
    pub message: String,
}

/// Result of one [`PresenceSession::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The throttle approved this sample and a `position` message was handed
    /// to the transport.
    pub position_sent: bool,
    /// Zone change detected on this tick (empty when the throttle declined).
    pub transition: ZoneTransition,
}

// ---------------------------------------------------------------------------
// Handler context
// ---------------------------------------------------------------------------

/// State the inbound handlers mutate.
pub struct SessionState<S> {
    pub sink: S,
    pub motion: PeerMotion,
    pub bubbles: SpeechBubbleManager,
    pub last_server_error: Option<ServerError>,
    now: Millis,
    lerp_duration_ms: Millis,
}

fn handle_presence<S: StateSink>(state: &mut SessionState<S>, message: &WireMessage) {
    let WireMessage::Presence {
        user_id,
        display_name,
        photo,
        x,
        y,
        zone_id,
        space_id,
    } = message
    else {
        return;
    };

    state
        .motion
        .observe(user_id, Point::new(*x, *y), state.now, state.lerp_duration_ms);

    state.sink.update_peer(PeerState {
        user_id: user_id.clone(),
        display_name: display_name.clone(),
        photo: photo.clone().flatten(),
        x: *x,
        y: *y,
        zone_id: zone_id.clone(),
        space_id: space_id.clone(),
        last_updated: state.now,
    });
}

fn handle_chat<S: StateSink>(state: &mut SessionState<S>, message: &WireMessage) {
    let WireMessage::Chat {
        text,
        sender_id,
        sender_name,
        timestamp,
    } = message
    else {
        return;
    };

    let sender_id = sender_id.clone().unwrap_or_else(|| "unknown".into());
    let timestamp = timestamp.unwrap_or(state.now as f64);

    state.bubbles.add_bubble(&sender_id, text, state.now);
    state.sink.add_chat_message(ChatEntry {
        id: format!("{sender_id}-{timestamp}"),
        sender_name: sender_name.clone().unwrap_or_else(|| "Unknown".into()),
        sender_id,
        text: text.clone(),
        timestamp,
    });
}

fn handle_transcript<S: StateSink>(state: &mut SessionState<S>, message: &WireMessage) {
    let WireMessage::Transcript {
        speaker_id,
        speaker_name,
        text,
        timestamp,
    } = message
    else {
        return;
    };

    state.bubbles.add_bubble(speaker_id, text, state.now);
    state.sink.add_chat_message(ChatEntry {
        id: format!("transcript-{speaker_id}-{timestamp}"),
        sender_id: speaker_id.clone(),
        sender_name: speaker_name.clone(),
        text: text.clone(),
        timestamp: *timestamp,
    });
}

fn handle_identity_ack<S: StateSink>(state: &mut SessionState<S>, message: &WireMessage) {
    if let WireMessage::IdentityAck {
        session_token,
        display_name,
    } = message
    {
        log::info!("[session] identity acknowledged as {}", display_name);
        state.sink.set_session_token(session_token.clone());
        state.sink.set_identity(display_name.clone(), None);
    }
}

fn handle_error<S: StateSink>(state: &mut SessionState<S>, message: &WireMessage) {
    if let WireMessage::Error { code, message } = message {
        log::warn!("[session] server error {}: {}", code, message);
        state.last_server_error = Some(ServerError {
            code: code.clone(),
            message: message.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct PresenceSession<T, S> {
    dispatcher: Dispatcher<T, SessionState<S>>,
    state: SessionState<S>,
    throttle: ThrottleState,
    zones: ZoneTracker,
    config: PresenceConfig,
}

impl<T: Transport, S: StateSink + 'static> PresenceSession<T, S> {
    pub fn new(config: PresenceConfig, transport: T, sink: S) -> Self {
        let mut dispatcher = Dispatcher::new(transport);
        dispatcher.on(MessageType::Presence, handle_presence::<S>);
        dispatcher.on(MessageType::Chat, handle_chat::<S>);
        dispatcher.on(MessageType::Transcript, handle_transcript::<S>);
        dispatcher.on(MessageType::IdentityAck, handle_identity_ack::<S>);
        dispatcher.on(MessageType::Error, handle_error::<S>);
        dispatcher.on_unknown(|_: &mut SessionState<S>, label: &str| {
            log::warn!("[session] ignoring unknown message type {}", label);
        });

        let state = SessionState {
            sink,
            motion: PeerMotion::new(),
            bubbles: SpeechBubbleManager::new(BubbleOptions::from(&config)),
            last_server_error: None,
            now: 0,
            lerp_duration_ms: config.lerp_duration_ms,
        };

        Self {
            dispatcher,
            state,
            throttle: ThrottleState::new(),
            zones: ZoneTracker::new(),
            config,
        }
    }

    /// Process everything the transport has received since the last call.
    pub fn poll(&mut self, now: Millis) -> Vec<LinkEvent> {
        self.state.now = now;
        let events = self.dispatcher.poll(&mut self.state);
        for event in &events {
            match event {
                LinkEvent::Opened => {
                    log::info!("[session] connected");
                    self.state.sink.set_connected(true);
                    let name = if self.config.display_name.is_empty() {
                        ANONYMOUS.to_string()
                    } else {
                        self.config.display_name.clone()
                    };
                    self.dispatcher
                        .send(&WireMessage::identity(name, self.config.photo.clone()));

                    // Anything sent while disconnected was dropped: restate
                    // the zone now and let the next tick resend the position.
                    self.throttle = ThrottleState::new();
                    if let Some(zone_id) = self.zones.current().map(str::to_string) {
                        log::debug!("[session] re-announcing zone {}", zone_id);
                        self.send_zone_join(&zone_id);
                    }
                }
                LinkEvent::Closed { code, reason } => {
                    log::info!("[session] disconnected ({} {})", code, reason);
                    self.state.sink.set_connected(false);
                }
                LinkEvent::Error(e) => {
                    log::warn!("[session] transport error: {}", e);
                    self.state.sink.set_connected(false);
                }
            }
        }
        events
    }

    /// Feed the local avatar position.
    ///
    /// Coordinates are rounded to whole units before the throttle sees them,
    /// so sub-unit jitter never triggers a send.
    pub fn tick(&mut self, local_x: f64, local_y: f64, now: Millis) -> TickOutcome {
        let (x, y) = (local_x.round(), local_y.round());
        if !self
            .throttle
            .should_send_update(x, y, now, self.config.update_interval_ms)
        {
            return TickOutcome::default();
        }

        self.throttle.mark_sent(x, y, now);
        self.state.sink.set_position(x, y);
        let position_sent = self.dispatcher.send(&WireMessage::position(x, y));

        let transition = self.zones.update(x, y, &self.config.zones);
        if transition.is_change() {
            if let Some(left) = &transition.left {
                log::debug!("[session] left zone {}", left);
                self.send_zone_leave(left);
            }
            if let Some(entered) = &transition.entered {
                log::debug!("[session] entered zone {}", entered);
                self.send_zone_join(entered);
            }
            self.state
                .sink
                .set_current_zone_id(transition.entered.clone());
        }

        TickOutcome {
            position_sent,
            transition,
        }
    }

    // ------------------------------------------------------------------
    // Outbound user actions
    // ------------------------------------------------------------------

    pub fn send_chat(&mut self, text: &str) -> bool {
        self.dispatcher.send(&WireMessage::chat(text))
    }

    pub fn send_zone_join(&mut self, zone_id: &str) -> bool {
        self.dispatcher
            .send(&WireMessage::zone_join(self.config.space_id.as_str(), zone_id))
    }

    pub fn send_zone_leave(&mut self, zone_id: &str) -> bool {
        self.dispatcher
            .send(&WireMessage::zone_leave(self.config.space_id.as_str(), zone_id))
    }

    pub fn send_audio(&mut self, data: impl Into<String>) -> bool {
        self.dispatcher.send(&WireMessage::Audio { data: data.into() })
    }

    // ------------------------------------------------------------------
    // Peers and bubbles
    // ------------------------------------------------------------------

    /// Forget a peer: its lerp target, its bubbles, and its sink entry.
    pub fn remove_peer(&mut self, user_id: &str) {
        self.state.motion.remove(user_id);
        self.state.bubbles.remove_speaker(user_id);
        self.state.sink.remove_peer(user_id);
    }

    /// Interpolated render position of a peer.
    pub fn peer_position(&self, user_id: &str, now: Millis) -> Option<Point> {
        self.state.motion.position_of(user_id, now)
    }

    pub fn peer_positions(&self, now: Millis) -> impl Iterator<Item = (&str, Point)> + '_ {
        self.state.motion.positions(now)
    }

    pub fn reap_bubbles(&mut self, now: Millis) -> Vec<BubbleId> {
        self.state.bubbles.cleanup(now)
    }

    pub fn bubbles(&self) -> &[SpeechBubble] {
        self.state.bubbles.get_all()
    }

    pub fn bubble_opacity(&self, bubble: &SpeechBubble, now: Millis) -> f64 {
        self.state.bubbles.opacity(bubble, now)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn sink(&self) -> &S {
        &self.state.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.state.sink
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    pub fn current_zone(&self) -> Option<&str> {
        self.zones.current()
    }

    pub fn last_server_error(&self) -> Option<&ServerError> {
        self.state.last_server_error.as_ref()
    }

    pub fn connected(&self) -> bool {
        self.dispatcher.connected()
    }

    pub fn close(&mut self) {
        self.dispatcher.close();
        self.state.sink.set_connected(false);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
