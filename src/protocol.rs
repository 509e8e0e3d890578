//! Client ↔ server wire protocol.
//!
//! This module owns **every message that crosses the socket** between the
//! presence client and the server.
//!
//! ## Message set
//!
//! | `type`         | Direction          | Fields                                              |
//! |----------------|--------------------|-----------------------------------------------------|
//! | `position`     | client → server    | x, y                                                |
//! | `chat`         | both               | text, senderId?, senderName?, timestamp?            |
//! | `zone:join`    | client → server    | spaceId, zoneId                                     |
//! | `zone:leave`   | client → server    | spaceId, zoneId                                     |
//! | `identity`     | client → server    | displayName, photo?                                 |
//! | `identity:ack` | server → client    | sessionToken, displayName                           |
//! | `transcript`   | server → client    | speakerId, speakerName, text, timestamp             |
//! | `presence`     | server → client    | userId, displayName, photo?, x, y, zoneId, spaceId  |
//! | `audio`        | client → server    | data                                                |
//! | `error`        | server → client    | code, message                                       |
//!
//! ## Design rules
//!
//! 1. Frames are MessagePack maps with camelCase keys and a `type` tag.
//! 2. Decode is permissive: unknown extra keys are ignored.
//!    Encode is exact: only the variant's fields are written, absent
//!    optionals are omitted.
//! 3. [`is_wire_message`] is the only structural gate between untrusted
//!    bytes and typed messages.

use rmpv::Value;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// The `type` discriminator strings, as constants.
pub mod tags {
    pub const POSITION: &str = "position";
    pub const CHAT: &str = "chat";
    pub const ZONE_JOIN: &str = "zone:join";
    pub const ZONE_LEAVE: &str = "zone:leave";
    pub const IDENTITY: &str = "identity";
    pub const IDENTITY_ACK: &str = "identity:ack";
    pub const TRANSCRIPT: &str = "transcript";
    pub const PRESENCE: &str = "presence";
    pub const AUDIO: &str = "audio";
    pub const ERROR: &str = "error";
}

/// The closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Position,
    Chat,
    ZoneJoin,
    ZoneLeave,
    Identity,
    IdentityAck,
    Transcript,
    Presence,
    Audio,
    Error,
}

impl MessageType {
    pub const COUNT: usize = 10;

    pub const ALL: [MessageType; Self::COUNT] = [
        MessageType::Position,
        MessageType::Chat,
        MessageType::ZoneJoin,
        MessageType::ZoneLeave,
        MessageType::Identity,
        MessageType::IdentityAck,
        MessageType::Transcript,
        MessageType::Presence,
        MessageType::Audio,
        MessageType::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Position => tags::POSITION,
            MessageType::Chat => tags::CHAT,
            MessageType::ZoneJoin => tags::ZONE_JOIN,
            MessageType::ZoneLeave => tags::ZONE_LEAVE,
            MessageType::Identity => tags::IDENTITY,
            MessageType::IdentityAck => tags::IDENTITY_ACK,
            MessageType::Transcript => tags::TRANSCRIPT,
            MessageType::Presence => tags::PRESENCE,
            MessageType::Audio => tags::AUDIO,
            MessageType::Error => tags::ERROR,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// Dense index in `0..COUNT`, for fixed-size handler tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// `photo` is tri-state on the wire: absent, `null`, or a string.
/// The outer `Option` is presence of the key, the inner one is nullability.
pub type Nullable<T> = Option<Option<T>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "position")]
    Position { x: f64, y: f64 },

    #[serde(rename = "chat", rename_all = "camelCase")]
    Chat {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },

    #[serde(rename = "zone:join", rename_all = "camelCase")]
    ZoneJoin { space_id: String, zone_id: String },

    #[serde(rename = "zone:leave", rename_all = "camelCase")]
    ZoneLeave { space_id: String, zone_id: String },

    #[serde(rename = "identity", rename_all = "camelCase")]
    Identity {
        display_name: String,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "present"
        )]
        photo: Nullable<String>,
    },

    #[serde(rename = "identity:ack", rename_all = "camelCase")]
    IdentityAck {
        session_token: String,
        display_name: String,
    },

    #[serde(rename = "transcript", rename_all = "camelCase")]
    Transcript {
        speaker_id: String,
        speaker_name: String,
        text: String,
        timestamp: f64,
    },

    #[serde(rename = "presence", rename_all = "camelCase")]
    Presence {
        user_id: String,
        display_name: String,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "present"
        )]
        photo: Nullable<String>,
        x: f64,
        y: f64,
        zone_id: String,
        space_id: String,
    },

    /// Opaque audio chunk (e.g. base64).
    #[serde(rename = "audio")]
    Audio { data: String },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}

/// A key that is present deserializes to `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl WireMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            WireMessage::Position { .. } => MessageType::Position,
            WireMessage::Chat { .. } => MessageType::Chat,
            WireMessage::ZoneJoin { .. } => MessageType::ZoneJoin,
            WireMessage::ZoneLeave { .. } => MessageType::ZoneLeave,
            WireMessage::Identity { .. } => MessageType::Identity,
            WireMessage::IdentityAck { .. } => MessageType::IdentityAck,
            WireMessage::Transcript { .. } => MessageType::Transcript,
            WireMessage::Presence { .. } => MessageType::Presence,
            WireMessage::Audio { .. } => MessageType::Audio,
            WireMessage::Error { .. } => MessageType::Error,
        }
    }

    pub fn position(x: f64, y: f64) -> Self {
        WireMessage::Position { x, y }
    }

    /// Outbound chat: the server fills in sender and timestamp.
    pub fn chat(text: impl Into<String>) -> Self {
        WireMessage::Chat {
            text: text.into(),
            sender_id: None,
            sender_name: None,
            timestamp: None,
        }
    }

    pub fn zone_join(space_id: impl Into<String>, zone_id: impl Into<String>) -> Self {
        WireMessage::ZoneJoin {
            space_id: space_id.into(),
            zone_id: zone_id.into(),
        }
    }

    pub fn zone_leave(space_id: impl Into<String>, zone_id: impl Into<String>) -> Self {
        WireMessage::ZoneLeave {
            space_id: space_id.into(),
            zone_id: zone_id.into(),
        }
    }

    /// Identity announcement. The photo key is always written (`null` when unset).
    pub fn identity(display_name: impl Into<String>, photo: Option<String>) -> Self {
        WireMessage::Identity {
            display_name: display_name.into(),
            photo: Some(photo),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// The `type` entry of a map, if there is one. Keys that are not strings
/// are skipped.
fn type_field(value: &Value) -> Option<&Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some("type"))
        .map(|(_, v)| v)
}

/// Structural gate: a map whose `type` is one of the known tags.
///
/// Per-variant field completeness is *not* checked here.
pub fn is_wire_message(value: &Value) -> bool {
    type_field(value)
        .and_then(Value::as_str)
        .and_then(MessageType::from_tag)
        .is_some()
}

/// Best-effort label for a value that failed [`is_wire_message`].
pub fn type_label(value: &Value) -> String {
    if !value.is_map() {
        return "non-object".into();
    }
    type_field(value)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(WireMessage),
    /// Decoded, but not a known message shape. Carries [`type_label`].
    Unknown(String),
}

/// Encode a message as a MessagePack map.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, ProtocolError> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Decode a frame into an untyped MessagePack value, without any validation.
///
/// Anything MessagePack can express decodes here (integer keys, `bin`,
/// `ext`), so only truncated or invalid bytes are malformed.
pub fn decode_value(frame: &[u8]) -> Result<Value, ProtocolError> {
    let mut rd = frame;
    Ok(rmpv::decode::read_value(&mut rd)?)
}

/// Decode and validate a frame.
///
/// `Err` means the bytes are not usable at all (malformed frame).
/// `Ok(Inbound::Unknown)` means they decoded but failed [`is_wire_message`].
pub fn decode(frame: &[u8]) -> Result<Inbound, ProtocolError> {
    let value = decode_value(frame)?;
    if !is_wire_message(&value) {
        return Ok(Inbound::Unknown(type_label(&value)));
    }

    let tag = type_label(&value);
    rmpv::ext::from_value::<WireMessage>(value)
        .map(Inbound::Message)
        .map_err(|source| ProtocolError::Incomplete { tag, source })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
