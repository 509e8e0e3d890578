//! Vibe presence client
//!
//! Real-time presence for a shared 2D space: the local avatar's position is
//! sent at a bounded rate, remote avatars are interpolated between samples,
//! zone membership changes are announced, and chat or voice transcripts
//! show up as timed speech bubbles.
//!
//! ## Architecture
//!
//! ```text
//! PresenceSession  (session.rs)  ← per-connection context, no globals
//!   ├── Dispatcher  (dispatcher.rs)  ← handler table keyed by message type
//!   │     ├── protocol  (protocol.rs)  ← MessagePack codec + validation
//!   │     └── Transport  (transport/)   ← MemoryTransport | WsTransport
//!   ├── ThrottleState  (throttle.rs)
//!   ├── PeerMotion / LerpTarget  (lerp.rs)
//!   ├── ZoneTracker  (zones.rs)
//!   ├── SpeechBubbleManager  (speech_bubble.rs)
//!   └── StateSink  (store.rs)  ← caller-owned application state
//! ```
//!
//! The timing primitives take `now` explicitly and never read a clock.
//! The WebSocket transport and the headless binary sit behind the `net`
//! feature.

// Core is always available (no net feature needed).
pub mod dispatcher;
pub mod error;
pub mod lerp;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod speech_bubble;
pub mod store;
pub mod throttle;
pub mod transport;
pub mod types;
pub mod zones;

pub use dispatcher::{Dispatcher, LinkEvent};
pub use error::{ProtocolError, SettingsError, TransportError};
pub use lerp::{LerpTarget, PeerMotion};
pub use protocol::{Inbound, MessageType, WireMessage};
pub use session::{PresenceSession, ServerError, TickOutcome};
pub use speech_bubble::{BubbleId, BubbleOptions, SpeechBubble, SpeechBubbleManager};
pub use store::{ChatEntry, PresenceStore, StateSink};
pub use throttle::ThrottleState;
pub use transport::{MemoryTransport, Transport, TransportEvent};
#[cfg(feature = "net")]
pub use transport::{WsConfig, WsTransport};
pub use types::{Millis, PeerState, Point, PresenceConfig};
pub use zones::{ZoneBounds, ZoneTracker, ZoneTransition};
