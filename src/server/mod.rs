//! The authoritative game server: a loopback TCP listener speaking
//! newline-delimited JSON, one reader task per connection, and a single
//! mutex serializing every handled message against the game registry.

pub mod codec;
pub mod handler;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, tcp::OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::dto::wire::ServerFrame;
use crate::server::codec::Frame;
use crate::state::registry::GameRegistry;

/// Identifier for one accepted socket.
pub type ConnId = u64;

/// How often the background sweep of ended games runs.
const SWEEP_PERIOD: Duration = Duration::from_secs(30);

/// Per-socket bookkeeping. The username is bound by REGISTER; the current
/// PIN tracks which game's broadcasts this socket receives.
pub struct Connection {
    pub username: Option<String>,
    pub current_pin: Option<String>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Wrap an outbound channel; the paired writer task owns the socket half.
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            username: None,
            current_pin: None,
            outbound,
        }
    }

    /// Queue one encoded line for this connection, best-effort.
    fn send_line(&self, line: String) {
        if self.outbound.send(line).is_err() {
            debug!("dropping frame for closed connection");
        }
    }
}

/// Registry and connection table, guarded together so every handled message
/// observes a consistent snapshot and broadcasts linearize with transitions.
pub struct ServerInner {
    pub registry: GameRegistry,
    pub connections: HashMap<ConnId, Connection>,
}

impl ServerInner {
    pub fn new() -> Self {
        Self {
            registry: GameRegistry::new(),
            connections: HashMap::new(),
        }
    }

    /// Send a frame to a single connection.
    pub fn reply(&self, conn_id: ConnId, frame: &ServerFrame) {
        let Some(connection) = self.connections.get(&conn_id) else {
            return;
        };
        match codec::encode(frame) {
            Ok(line) => connection.send_line(line),
            Err(err) => warn!(error = %err, "failed to encode reply"),
        }
    }

    /// Fan a frame out to every connection currently inside `pin`. A dead
    /// connection never prevents delivery to its siblings.
    pub fn broadcast(&self, pin: &str, frame: &ServerFrame) {
        let line = match codec::encode(frame) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to encode broadcast");
                return;
            }
        };
        for connection in self.connections.values() {
            if connection.current_pin.as_deref() == Some(pin) {
                connection.send_line(line.clone());
            }
        }
    }
}

impl Default for ServerInner {
    fn default() -> Self {
        Self::new()
    }
}

/// Authoritative game server instance.
pub struct GameServer {
    inner: Mutex<ServerInner>,
    next_conn_id: AtomicU64,
}

impl GameServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ServerInner::new()),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Bind the listener and accept connections until the task is dropped.
    pub async fn listen(self: Arc<Self>, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "game server listening");
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener (tests bind port 0).
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "connection accepted");
            let server = self.clone();
            tokio::spawn(async move {
                server.handle_connection(stream).await;
            });
        }
    }

    /// Periodically drop ended games that outlived their TTL.
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            let mut inner = self.inner.lock().await;
            inner.registry.sweep_ended(Instant::now());
        }
    }

    /// Full lifecycle of one accepted socket: register the connection, pump
    /// decoded frames through the dispatcher, deregister on exit. A closed
    /// socket is NOT an EXIT_GAME; the bridge multiplexes many usernames and
    /// departures are explicit.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();

        // Dedicated writer task serializes writes on this socket.
        let writer_task = tokio::spawn(write_outbound(write_half, outbound_rx));

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut inner = self.inner.lock().await;
            inner.connections.insert(conn_id, Connection::new(outbound_tx));
        }

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => match codec::classify(&line) {
                    Frame::Json(value) => self.handle_frame(conn_id, value).await,
                    Frame::Ignore => {}
                    Frame::HttpProbe => {
                        warn!(conn_id, "HTTP probe on game port; closing connection");
                        break;
                    }
                },
                Err(err) => {
                    debug!(conn_id, error = %err, "connection read error");
                    break;
                }
            }
        }

        {
            let mut inner = self.inner.lock().await;
            inner.connections.remove(&conn_id);
        }
        let _ = writer_task.await;
        debug!(conn_id, "connection closed");
    }

    /// Handle one decoded frame under the registry lock.
    pub async fn handle_frame(&self, conn_id: ConnId, frame: Value) {
        let mut inner = self.inner.lock().await;
        handler::dispatch(&mut inner, conn_id, frame);
    }
}

/// Drain the outbound channel onto the socket until either side closes.
async fn write_outbound(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(err) = write_half.write_all(line.as_bytes()).await {
            debug!(error = %err, "socket write failed");
            break;
        }
    }
}
