//! WebSocket transport – Tokio bridge thread, polled from the caller's thread.
//!
//! ## Threading model
//!
//! ```text
//! Caller thread (tick loop)       │  Bridge thread (current-thread Tokio)
//! ─────────────────────────────── │ ──────────────────────────────────────
//! WsTransport::poll()             │  run_bridge()
//!   → events.try_recv()           │    socket.next() → TransportEvent
//!                                 │    → event_tx.try_send(...)
//! WsTransport::send(frame)        │
//!   → outbound.try_send(frame)    │    outbound_rx.recv() → socket.send()
//! ```
//!
//! The bridge thread owns the socket and the runtime; the caller never
//! touches async code. Reconnect policy is left to the owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::{Transport, TransportEvent};
use crate::error::TransportError;

/// Close code reported when the connection drops without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Server URL, e.g. `ws://localhost:30104/ws`.
    pub url: String,
    /// Inbound events buffered before the bridge starts dropping.
    pub event_buffer: usize,
    /// Outbound frames buffered before `send` reports back-pressure.
    pub outbound_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:30104/ws".into(),
            event_buffer: 1024,
            outbound_buffer: 256,
        }
    }
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

pub struct WsTransport {
    events: Receiver<TransportEvent>,
    outbound: mpsc::Sender<Outbound>,
    open: Arc<AtomicBool>,
    /// Set by `close`; wins over a handshake that completes afterwards.
    closed: bool,
    _thread: thread::JoinHandle<()>,
}

impl WsTransport {
    /// Spawn the bridge thread and start connecting. Returns immediately;
    /// `Opened` (or `Error` + `Closed`) shows up on a later poll.
    pub fn connect(config: WsConfig) -> Result<Self, TransportError> {
        let (event_tx, event_rx) = crossbeam_channel::bounded(config.event_buffer);
        let (out_tx, out_rx) = mpsc::channel(config.outbound_buffer);
        let open = Arc::new(AtomicBool::new(false));

        let bridge_open = open.clone();
        let handle = thread::Builder::new()
            .name("vibe-ws-bridge".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("[ws] runtime build failed: {}", e);
                        let _ = event_tx.try_send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                };
                rt.block_on(run_bridge(config.url, event_tx, out_rx, bridge_open));
            })
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            events: event_rx,
            outbound: out_tx,
            open,
            closed: false,
            _thread: handle,
        })
    }
}

impl Transport for WsTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outbound
            .try_send(Outbound::Frame(frame))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
                mpsc::error::TrySendError::Closed(_) => TransportError::NotOpen,
            })
    }

    fn is_open(&self) -> bool {
        !self.closed && self.open.load(Ordering::Acquire)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.outbound.try_send(Outbound::Close);
        }
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Async bridge
// ---------------------------------------------------------------------------

async fn run_bridge(
    url: String,
    event_tx: Sender<TransportEvent>,
    mut outbound: mpsc::Receiver<Outbound>,
    open: Arc<AtomicBool>,
) {
    log::info!("[ws] connecting to {}", url);

    let socket = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            log::error!("[ws] connect failed: {}", e);
            emit(&event_tx, TransportEvent::Error(format!("connect failed: {e}")));
            emit(
                &event_tx,
                TransportEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                    reason: e.to_string(),
                },
            );
            return;
        }
    };

    let (mut write, mut read) = socket.split();
    open.store(true, Ordering::Release);
    emit(&event_tx, TransportEvent::Opened);
    log::info!("[ws] connected");

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Binary(data))) => emit(&event_tx, TransportEvent::Frame(data)),
                Some(Ok(Message::Text(text))) => {
                    log::debug!("[ws] ignoring text frame ({} bytes)", text.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason): (u16, String) = frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    open.store(false, Ordering::Release);
                    emit(&event_tx, TransportEvent::Closed { code, reason });
                    break;
                }
                // Ping/pong replies are queued by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    open.store(false, Ordering::Release);
                    emit(&event_tx, TransportEvent::Error(e.to_string()));
                    emit(&event_tx, TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: e.to_string(),
                    });
                    break;
                }
                None => {
                    open.store(false, Ordering::Release);
                    emit(&event_tx, TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".into(),
                    });
                    break;
                }
            },

            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = write.send(Message::Binary(frame)).await {
                        log::warn!("[ws] send failed: {}", e);
                    }
                }
                // Local close, or the handle was dropped.
                Some(Outbound::Close) | None => {
                    open.store(false, Ordering::Release);
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    log::info!("[ws] bridge exiting");
}

fn emit(tx: &Sender<TransportEvent>, event: TransportEvent) {
    if tx.try_send(event).is_err() {
        log::warn!("[ws] event channel full – dropping event");
    }
}
