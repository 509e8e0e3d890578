//! In-memory transport.
//!
//! Clones share one connection state (`Rc<RefCell<…>>`, single-threaded),
//! so a test can keep a handle to inject inbound events and inspect what
//! the dispatcher sent while the dispatcher owns its own clone.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{Transport, TransportEvent};
use crate::error::TransportError;
use crate::protocol::{self, WireMessage};

#[derive(Debug, Default)]
struct State {
    open: bool,
    inbound: VecDeque<TransportEvent>,
    sent: Vec<Vec<u8>>,
    close_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    shared: Rc<RefCell<State>>,
}

impl MemoryTransport {
    /// A transport that has not opened yet.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Remote side
    // ------------------------------------------------------------------

    /// Mark open and queue `Opened`.
    pub fn open(&self) {
        let mut st = self.shared.borrow_mut();
        st.open = true;
        st.inbound.push_back(TransportEvent::Opened);
    }

    pub fn push_frame(&self, frame: Vec<u8>) {
        self.shared
            .borrow_mut()
            .inbound
            .push_back(TransportEvent::Frame(frame));
    }

    /// Encode `message` and queue it as an inbound frame.
    pub fn push_message(&self, message: &WireMessage) -> Result<(), crate::error::ProtocolError> {
        self.push_frame(protocol::encode(message)?);
        Ok(())
    }

    /// Simulate the server closing the connection.
    pub fn remote_close(&self, code: u16, reason: &str) {
        let mut st = self.shared.borrow_mut();
        st.open = false;
        st.inbound.push_back(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    pub fn fail(&self, error: &str) {
        let mut st = self.shared.borrow_mut();
        st.open = false;
        st.inbound.push_back(TransportEvent::Error(error.to_string()));
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.shared.borrow().sent.clone()
    }

    /// Sent frames decoded back into messages; undecodable frames are skipped.
    pub fn sent_messages(&self) -> Vec<WireMessage> {
        self.shared
            .borrow()
            .sent
            .iter()
            .filter_map(|f| match protocol::decode(f) {
                Ok(protocol::Inbound::Message(m)) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn take_sent(&self) -> Vec<WireMessage> {
        let messages = self.sent_messages();
        self.shared.borrow_mut().sent.clear();
        messages
    }

    pub fn close_calls(&self) -> usize {
        self.shared.borrow().close_calls
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut st = self.shared.borrow_mut();
        if !st.open {
            return Err(TransportError::NotOpen);
        }
        st.sent.push(frame);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.borrow().open
    }

    fn close(&mut self) {
        let mut st = self.shared.borrow_mut();
        st.open = false;
        st.close_calls += 1;
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        self.shared.borrow_mut().inbound.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
