//! Per-username TCP sessions toward the game server.
//!
//! The bridge multiplexes browser identities over one logical TCP session
//! per username. A session owns a writer task, a reader task fanning decoded
//! frames out to subscribers and the user's SSE hub, and a connected flag
//! that lets `/connect` replace a session whose socket died.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::dto::sse::ServerEvent;
use crate::error::ServiceError;
use crate::state::sse::SseRegistry;

/// How long a correlated HTTP call waits for its push frame.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
/// Buffered decoded frames per session before slow subscribers lag.
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// One logical TCP session between the bridge and the game server.
pub struct BridgeSession {
    username: String,
    outbound: mpsc::UnboundedSender<String>,
    frames: broadcast::Sender<Arc<Value>>,
    connected: AtomicBool,
}

impl BridgeSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue one frame for the game server.
    pub fn send(&self, payload: &Value) -> Result<(), ServiceError> {
        if !self.is_connected() {
            return Err(ServiceError::NotConnected);
        }
        let mut line = payload.to_string();
        line.push('\n');
        self.outbound
            .send(line)
            .map_err(|_| ServiceError::NotConnected)
    }

    /// Stream of decoded frames received on this session.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Value>> {
        self.frames.subscribe()
    }

    /// Write `request` and wait for the first `reply_type` frame matching
    /// `predicate`. The subscription is installed before the write so a fast
    /// reply cannot slip past.
    pub async fn request_and_wait<F>(
        &self,
        request: &Value,
        reply_type: &str,
        predicate: F,
    ) -> Result<Value, ServiceError>
    where
        F: Fn(&Value) -> bool,
    {
        let receiver = self.subscribe();
        self.send(request)?;
        recv_matching(receiver, reply_type, predicate).await
    }
}

/// Wait for a matching frame on an already-open subscription.
pub async fn recv_matching<F>(
    mut receiver: broadcast::Receiver<Arc<Value>>,
    reply_type: &str,
    predicate: F,
) -> Result<Value, ServiceError>
where
    F: Fn(&Value) -> bool,
{
    let wait = async move {
        loop {
            match receiver.recv().await {
                Ok(frame) => {
                    let matches_type =
                        frame.get("type").and_then(Value::as_str) == Some(reply_type);
                    if matches_type && predicate(&frame) {
                        return Ok((*frame).clone());
                    }
                }
                // A lagged subscriber just keeps waiting for fresher frames.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ServiceError::NotConnected);
                }
            }
        }
    };

    match timeout(REPLY_TIMEOUT, wait).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(reply_type.to_string())),
    }
}

/// The bridge's username → session mapping.
pub struct SessionPool {
    sessions: DashMap<String, Arc<BridgeSession>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Look up a live session; callers get `Not connected` otherwise.
    pub fn get(&self, username: &str) -> Result<Arc<BridgeSession>, ServiceError> {
        match self.sessions.get(username) {
            Some(entry) if entry.is_connected() => Ok(Arc::clone(entry.value())),
            _ => Err(ServiceError::NotConnected),
        }
    }

    /// Reuse a live session, or dial a fresh one and complete the
    /// REGISTER/REGISTER_OK handshake before reporting success.
    pub async fn connect(
        &self,
        username: &str,
        tcp_addr: &str,
        sse: SseRegistry,
    ) -> Result<Arc<BridgeSession>, ServiceError> {
        if let Some(existing) = self.sessions.get(username) {
            if existing.is_connected() {
                debug!(username, "reusing live game-server session");
                return Ok(Arc::clone(existing.value()));
            }
        }
        // A stale entry is replaced wholesale; its tasks die with the socket.
        self.sessions.remove(username);

        let stream = TcpStream::connect(tcp_addr).await.map_err(|err| {
            ServiceError::Internal(format!("game server unreachable: {err}"))
        })?;
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (frames_tx, _) = broadcast::channel::<Arc<Value>>(FRAME_CHANNEL_CAPACITY);

        let session = Arc::new(BridgeSession {
            username: username.to_string(),
            outbound: outbound_tx,
            frames: frames_tx,
            connected: AtomicBool::new(true),
        });

        tokio::spawn(write_outbound(write_half, outbound_rx));
        tokio::spawn(read_frames(read_half, session.clone(), sse));

        let handshake = session
            .request_and_wait(
                &json!({"type": "REGISTER", "username": username}),
                "REGISTER_OK",
                |frame| frame.get("username").and_then(Value::as_str) == Some(username),
            )
            .await;

        if let Err(err) = handshake {
            warn!(username, error = %err, "session handshake failed");
            session.connected.store(false, Ordering::Release);
            return Err(err);
        }

        info!(username, "game-server session established");
        self.sessions.insert(username.to_string(), session.clone());
        Ok(session)
    }
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain the outbound channel onto the socket until either side closes.
async fn write_outbound(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(err) = write_half.write_all(line.as_bytes()).await {
            debug!(error = %err, "session write failed");
            break;
        }
    }
}

/// Pump decoded frames into the session's broadcast stream and the owner's
/// SSE hub until the socket closes.
async fn read_frames(
    read_half: tokio::net::tcp::OwnedReadHalf,
    session: Arc<BridgeSession>,
    sse: SseRegistry,
) {
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(value) => {
                        sse.broadcast(&session.username, ServerEvent::raw(trimmed));
                        let _ = session.frames.send(Arc::new(value));
                    }
                    Err(err) => {
                        debug!(username = %session.username, error = %err, "undecodable frame from game server");
                    }
                }
            }
            Err(err) => {
                debug!(username = %session.username, error = %err, "session read error");
                break;
            }
        }
    }

    session.connected.store(false, Ordering::Release);
    sse.broadcast(
        &session.username,
        ServerEvent::error_frame("Game server connection lost"),
    );
    info!(username = %session.username, "game-server session closed");
}
