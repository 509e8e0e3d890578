//! Transport seam between the dispatcher and the network.
//!
//! A transport is polled, never called back: the owner drains
//! [`TransportEvent`]s on its own thread (render or tick loop) and the
//! dispatcher turns them into handler invocations. This keeps every
//! handler on one timeline with no re-entrancy.
//!
//! | Implementation      | Feature | Use                                   |
//! |---------------------|---------|---------------------------------------|
//! | [`MemoryTransport`] | –       | tests, offline replay                 |
//! | `WsTransport`       | `net`   | WebSocket via a Tokio bridge thread   |

mod memory;
#[cfg(feature = "net")]
pub mod ws;

pub use memory::MemoryTransport;
#[cfg(feature = "net")]
pub use ws::{WsConfig, WsTransport};

use crate::error::TransportError;

/// Something that happened on the connection since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Closed { code: u16, reason: String },
    Error(String),
    /// One binary frame, undecoded.
    Frame(Vec<u8>),
}

pub trait Transport {
    /// Queue one frame. Fails fast when the connection is not open; never
    /// retries or buffers for later.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    /// Idempotent. `is_open` reports `false` as soon as this returns.
    fn close(&mut self);

    /// Drain pending events without blocking, in arrival order.
    fn poll(&mut self) -> Vec<TransportEvent>;
}
