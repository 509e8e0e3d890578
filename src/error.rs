//! Error types.
//!
//! None of these cross the dispatch boundary: malformed frames and failed
//! sends are logged and dropped by the dispatcher. They surface only from the
//! codec, transport and settings APIs when called directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Bytes are not valid MessagePack.
    #[error("malformed frame: {0}")]
    Malformed(#[from] rmpv::decode::Error),

    /// A known `type` whose fields do not fit the variant.
    #[error("incomplete `{tag}` message: {source}")]
    Incomplete {
        tag: String,
        #[source]
        source: rmpv::ext::Error,
    },

    #[error("encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,

    #[error("outbound queue full")]
    Backpressure,

    #[error("connect failed: {0}")]
    Connect(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
