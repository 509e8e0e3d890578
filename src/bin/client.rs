//! vibe-presence-client binary
//!
//! Headless presence client: connects to a server, announces an identity,
//! walks an avatar around the scene and logs what everyone else is doing.
//! Useful as a load generator and as a smoke test for a deployment.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                        | Default                    | Description                     |
//! |----------------------------|----------------------------|---------------------------------|
//! | `VIBE_URL`                 | `ws://localhost:30104/ws`  | Server WebSocket URL            |
//! | `VIBE_DISPLAY_NAME`        | (empty → `Anonymous`)      | Name sent in `identity`         |
//! | `VIBE_SPACE_ID`            | `cafe`                     | Space for zone join/leave       |
//! | `VIBE_UPDATE_INTERVAL_MS`  | `100`                      | Position send interval          |
//! | `VIBE_LERP_DURATION_MS`    | `120`                      | Remote avatar glide time        |
//! | `VIBE_TICK_HZ`             | `60`                       | Local simulation rate           |

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use vibe_presence::{
    settings, ChatEntry, LinkEvent, Millis, PeerState, Point, PresenceSession, PresenceStore, StateSink,
    Transport, WsConfig, WsTransport,
};

/// Walk speed in scene units per second.
const MOVE_SPEED: f64 = 200.0;
/// Avatars are kept this far from the scene edge.
const AVATAR_RADIUS: f64 = 24.0;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "vibe-presence-client", about = "Vibe presence client", version)]
struct Args {
    /// Server WebSocket URL
    #[arg(long, env = "VIBE_URL", default_value = "ws://localhost:30104/ws")]
    url: String,

    /// Display name (overrides config)
    #[arg(long, env = "VIBE_DISPLAY_NAME")]
    name: Option<String>,

    /// Space id (overrides config)
    #[arg(long)]
    space: Option<String>,

    /// TOML config file
    #[arg(long, env = "VIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Local tick rate (Hz)
    #[arg(long, env = "VIBE_TICK_HZ", default_value_t = 60.0)]
    tick_hz: f64,

    /// Chat line to send once connected
    #[arg(long)]
    say: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging sink
// ---------------------------------------------------------------------------

/// Wraps the reference store and logs the interesting transitions.
struct LoggingStore {
    inner: PresenceStore,
}

impl StateSink for LoggingStore {
    fn set_position(&mut self, x: f64, y: f64) {
        self.inner.set_position(x, y);
    }

    fn update_peer(&mut self, peer: PeerState) {
        match self.inner.peer(&peer.user_id) {
            None => tracing::info!(user = %peer.user_id, name = %peer.display_name, "peer joined"),
            Some(prev) if prev.zone_id != peer.zone_id => tracing::info!(
                user = %peer.user_id,
                zone = %peer.zone_id,
                "peer changed zone"
            ),
            Some(_) => {}
        }
        self.inner.update_peer(peer);
    }

    fn remove_peer(&mut self, user_id: &str) {
        tracing::info!(user = %user_id, "peer removed");
        self.inner.remove_peer(user_id);
    }

    fn set_connected(&mut self, connected: bool) {
        self.inner.set_connected(connected);
    }

    fn add_chat_message(&mut self, entry: ChatEntry) {
        tracing::info!("[{}] {}", entry.sender_name, entry.text);
        self.inner.add_chat_message(entry);
    }

    fn set_identity(&mut self, display_name: String, photo: Option<String>) {
        self.inner.set_identity(display_name, photo);
    }

    fn set_session_token(&mut self, token: String) {
        self.inner.set_session_token(token);
    }

    fn set_current_zone_id(&mut self, zone_id: Option<String>) {
        tracing::info!(zone = ?zone_id, "local zone");
        self.inner.set_current_zone_id(zone_id);
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Moves the local avatar between the corners of an inset rectangle.
struct Walker {
    position: Point,
    waypoints: Vec<Point>,
    next: usize,
}

impl Walker {
    fn new(start: Point, width: f64, height: f64) -> Self {
        let (w, h) = (width, height);
        let waypoints = vec![
            Point::new(w * 0.25, h * 0.25),
            Point::new(w * 0.75, h * 0.25),
            Point::new(w * 0.75, h * 0.75),
            Point::new(w * 0.25, h * 0.75),
        ];
        Self {
            position: start,
            waypoints,
            next: 0,
        }
    }

    fn step(&mut self, dt_secs: f64, width: f64, height: f64) -> Point {
        let target = self.waypoints[self.next];
        let (dx, dy) = (target.x - self.position.x, target.y - self.position.y);
        let dist = (dx * dx + dy * dy).sqrt();
        let stride = MOVE_SPEED * dt_secs;

        if dist <= stride {
            self.position = target;
            self.next = (self.next + 1) % self.waypoints.len();
        } else {
            self.position.x += dx / dist * stride;
            self.position.y += dy / dist * stride;
        }

        self.position.x = self.position.x.clamp(AVATAR_RADIUS, width - AVATAR_RADIUS);
        self.position.y = self.position.y.clamp(AVATAR_RADIUS, height - AVATAR_RADIUS);
        self.position
    }
}

// ---------------------------------------------------------------------------
// Tick loop
// ---------------------------------------------------------------------------

/// Drive the session until the server closes or `shutdown` resolves.
async fn run<T, F>(
    session: &mut PresenceSession<T, LoggingStore>,
    walker: &mut Walker,
    mut pending_say: Option<String>,
    (width, height): (f64, f64),
    period: Duration,
    shutdown: F,
) where
    T: Transport,
    F: Future<Output = io::Result<()>>,
{
    let start = Instant::now();
    let mut ticker = tokio::time::interval(period);
    let mut last = start;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let wall = Instant::now();
                let now = wall.duration_since(start).as_millis() as Millis;
                let dt = wall.duration_since(last).as_secs_f64();
                last = wall;

                let events = session.poll(now);
                if events.iter().any(|e| matches!(e, LinkEvent::Closed { .. })) {
                    log::warn!("Connection closed by server, exiting");
                    break;
                }
                if !session.connected() {
                    continue;
                }

                if let Some(text) = pending_say.take() {
                    session.send_chat(&text);
                }

                let pos = walker.step(dt, width, height);
                let outcome = session.tick(pos.x, pos.y, now);
                if outcome.transition.is_change() {
                    log::debug!("zone transition {:?}", outcome.transition);
                }
                session.reap_bubbles(now);
            }
            _ = &mut shutdown => {
                log::info!("Shutdown requested, closing");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vibe_presence=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config =
        settings::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(name) = args.name {
        config.display_name = name;
    }
    if let Some(space) = args.space {
        config.space_id = space;
    }
    let tick_hz = if args.tick_hz > 0.0 { args.tick_hz } else { 60.0 };

    log::info!(
        "Starting vibe-presence-client (url='{}', name='{}', space='{}', zones={})",
        args.url,
        config.display_name,
        config.space_id,
        config.zones.len(),
    );

    let transport = WsTransport::connect(WsConfig {
        url: args.url,
        ..WsConfig::default()
    })
    .context("starting WebSocket bridge")?;
    let store = LoggingStore {
        inner: PresenceStore::new(config.chat_history_cap),
    };
    let (width, height) = (config.scene_width, config.scene_height);
    let mut session = PresenceSession::new(config, transport, store);
    let mut walker = Walker::new(PresenceStore::DEFAULT_POSITION, width, height);

    let period = Duration::from_secs_f64(1.0 / tick_hz);
    run(
        &mut session,
        &mut walker,
        args.say,
        (width, height),
        period,
        tokio::signal::ctrl_c(),
    )
    .await;

    session.close();
    let store = &session.sink().inner;
    log::info!(
        "Shutdown complete ({} peers seen, {} chat lines)",
        store.peers.len(),
        store.chat_len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_presence::{MemoryTransport, PresenceConfig, WireMessage};

    fn logging_session(remote: &MemoryTransport) -> PresenceSession<MemoryTransport, LoggingStore> {
        let store = LoggingStore {
            inner: PresenceStore::default(),
        };
        PresenceSession::new(PresenceConfig::default(), remote.clone(), store)
    }

    #[tokio::test]
    async fn shutdown_fires_while_ticks_keep_coming() {
        let remote = MemoryTransport::new();
        remote.open();
        let mut session = logging_session(&remote);
        let mut walker = Walker::new(PresenceStore::DEFAULT_POSITION, 800.0, 600.0);

        // Outlives many 2 ms ticks; a shutdown future rebuilt per tick would never fire.
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(())
        };
        tokio::time::timeout(
            Duration::from_secs(5),
            run(
                &mut session,
                &mut walker,
                Some("hello".into()),
                (800.0, 600.0),
                Duration::from_millis(2),
                shutdown,
            ),
        )
        .await
        .expect("loop should stop on shutdown");

        let sent = remote.sent_messages();
        assert!(matches!(sent.first(), Some(WireMessage::Identity { .. })));
        assert!(sent.iter().any(|m| matches!(m, WireMessage::Chat { text, .. } if text == "hello")));
        assert!(sent.iter().any(|m| matches!(m, WireMessage::Position { .. })));
    }

    #[tokio::test]
    async fn server_close_ends_the_loop() {
        let remote = MemoryTransport::new();
        remote.open();
        remote.remote_close(1000, "bye");
        let mut session = logging_session(&remote);
        let mut walker = Walker::new(PresenceStore::DEFAULT_POSITION, 800.0, 600.0);

        tokio::time::timeout(
            Duration::from_secs(5),
            run(
                &mut session,
                &mut walker,
                None,
                (800.0, 600.0),
                Duration::from_millis(2),
                std::future::pending::<io::Result<()>>(),
            ),
        )
        .await
        .expect("loop should stop on close");
        assert!(!session.connected());
    }
}
