//! Message dispatcher: one handler slot per message type.
//!
//! The dispatcher owns a [`Transport`], decodes every inbound frame, and
//! routes it to the handler registered for its type. Handlers receive a
//! caller-supplied context `C` (usually the session state), so they can
//! mutate application state without shared ownership.
//!
//! Routing rules:
//!
//! - Frames are dispatched in arrival order, one at a time.
//! - Malformed frames (bad MessagePack, or a known type with missing
//!   fields) are dropped with a debug log. No handler runs.
//! - Frames that decode but are not a known message go to the unknown
//!   hook (if any) with their [`type_label`](crate::protocol::type_label).
//! - A known message with no handler registered is dropped silently.
//!
//! Outbound sends are fire-and-forget: when the transport is not open the
//! message is dropped. Nothing is queued or retried.

use crate::protocol::{self, Inbound, MessageType, WireMessage};
use crate::transport::{Transport, TransportEvent};

type Handler<C> = Box<dyn FnMut(&mut C, &WireMessage)>;
type UnknownHook<C> = Box<dyn FnMut(&mut C, &str)>;

/// Connection lifecycle, as seen by the owner of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Closed { code: u16, reason: String },
    Error(String),
}

pub struct Dispatcher<T, C> {
    transport: T,
    handlers: [Option<Handler<C>>; MessageType::COUNT],
    unknown: Option<UnknownHook<C>>,
}

impl<T: Transport, C> Dispatcher<T, C> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handlers: std::array::from_fn(|_| None),
            unknown: None,
        }
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn on<F>(&mut self, kind: MessageType, handler: F)
    where
        F: FnMut(&mut C, &WireMessage) + 'static,
    {
        self.handlers[kind.index()] = Some(Box::new(handler));
    }

    pub fn off(&mut self, kind: MessageType) {
        self.handlers[kind.index()] = None;
    }

    pub fn has_handler(&self, kind: MessageType) -> bool {
        self.handlers[kind.index()].is_some()
    }

    /// Called with the label of every frame that decodes but is not a
    /// known message.
    pub fn on_unknown<F>(&mut self, hook: F)
    where
        F: FnMut(&mut C, &str) + 'static,
    {
        self.unknown = Some(Box::new(hook));
    }

    /// Encode and send. Returns `true` if the frame reached the transport.
    pub fn send(&mut self, message: &WireMessage) -> bool {
        if !self.transport.is_open() {
            log::debug!("[dispatch] not connected, dropping {}", message.message_type());
            return false;
        }
        let frame = match protocol::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("[dispatch] encode {} failed: {}", message.message_type(), e);
                return false;
            }
        };
        match self.transport.send(frame) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("[dispatch] send {} failed: {}", message.message_type(), e);
                false
            }
        }
    }

    pub fn connected(&self) -> bool {
        self.transport.is_open()
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drain the transport and run handlers for every inbound frame.
    ///
    /// Lifecycle events are returned in arrival order. Handlers for frames
    /// that arrived before a close have already run by the time the caller
    /// sees the `Closed` event.
    pub fn poll(&mut self, ctx: &mut C) -> Vec<LinkEvent> {
        let mut link = Vec::new();
        for event in self.transport.poll() {
            match event {
                TransportEvent::Frame(frame) => self.dispatch(ctx, &frame),
                TransportEvent::Opened => link.push(LinkEvent::Opened),
                TransportEvent::Closed { code, reason } => {
                    link.push(LinkEvent::Closed { code, reason })
                }
                TransportEvent::Error(e) => link.push(LinkEvent::Error(e)),
            }
        }
        link
    }

    /// Route one frame.
    pub fn dispatch(&mut self, ctx: &mut C, frame: &[u8]) {
        match protocol::decode(frame) {
            Err(e) => log::debug!("[dispatch] dropping frame ({} bytes): {}", frame.len(), e),
            Ok(Inbound::Unknown(label)) => {
                log::debug!("[dispatch] unknown message: {}", label);
                if let Some(hook) = self.unknown.as_mut() {
                    hook(ctx, &label);
                }
            }
            Ok(Inbound::Message(message)) => {
                if let Some(handler) = self.handlers[message.message_type().index()].as_mut() {
                    handler(ctx, &message);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
