//! Push channel controller — the real-time convenience layer.
//!
//! One WebSocket connection per board session, owned by a `PushChannel`
//! started on mount and stopped on unmount. Incoming frames are validated
//! at the boundary into the tagged [`PushMessage`] enum; anything malformed
//! is dropped with a logged parse error, never propagated. The channel is
//! best-effort by design: on close it reconnects with a linear backoff
//! (`attempt * base_delay`) up to a fixed attempt budget, then fails stop —
//! the REST refetch path remains the system of record.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;

// ── Push message types ───────────────────────────────────────────────

/// A validated push frame. The wire shape is a flat JSON object with a
/// `type` discriminator and type-specific payload fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Automation agent heartbeat/status broadcast.
    AgentStatus { active: bool, current_task: String },
    /// The board changed server-side; the cache should refetch.
    KanbanUpdated {
        #[serde(default)]
        reason: String,
    },
    /// The agent ingested an email — proposed changes may now be pending.
    EmailReceived { from: String, subject: String },
    /// A tracked task was completed.
    TaskCompleted { task_id: i64, title: String },
}

/// Which sink a message is routed to. Exactly one per message: board
/// refreshes and approval notifications never share a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Board,
    Approvals,
    Activity,
}

impl PushMessage {
    pub fn dispatch(&self) -> Dispatch {
        match self {
            Self::KanbanUpdated { .. } => Dispatch::Board,
            Self::EmailReceived { .. } => Dispatch::Approvals,
            Self::AgentStatus { .. } | Self::TaskCompleted { .. } => Dispatch::Activity,
        }
    }

    /// One-line human rendering for the activity log.
    pub fn describe(&self) -> String {
        match self {
            Self::AgentStatus { active, current_task } => {
                let state = if *active { "active" } else { "idle" };
                format!("agent {}: {}", state, current_task)
            }
            Self::KanbanUpdated { reason } if reason.is_empty() => "board updated".to_string(),
            Self::KanbanUpdated { reason } => format!("board updated: {}", reason),
            Self::EmailReceived { from, subject } => {
                format!("email from {}: {}", from, subject)
            }
            Self::TaskCompleted { task_id, title } => {
                format!("task #{} completed: {}", task_id, title)
            }
        }
    }
}

/// Parse and validate one inbound frame. Malformed or unknown payloads are
/// dropped here, with the reason logged.
pub fn parse_push_message(text: &str) -> Option<PushMessage> {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("push: dropping malformed message: {}", e);
            None
        }
    }
}

// ── Connection state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    fn set(&self, state: ChannelState) {
        let value = match state {
            ChannelState::Disconnected => 0,
            ChannelState::Connecting => 1,
            ChannelState::Connected => 2,
        };
        self.0.store(value, Ordering::SeqCst);
    }

    fn get(&self) -> ChannelState {
        match self.0.load(Ordering::SeqCst) {
            1 => ChannelState::Connecting,
            2 => ChannelState::Connected,
            _ => ChannelState::Disconnected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl From<&SyncConfig> for ReconnectPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_delay: config.reconnect_base_delay,
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Linear backoff: attempt N (1-based) waits N times the base delay.
fn backoff_delay(policy: ReconnectPolicy, attempt: u32) -> Duration {
    policy.base_delay * attempt
}

// ── Controller ───────────────────────────────────────────────────────

/// Lifecycle-scoped owner of the push connection. Created on view mount via
/// [`PushChannel::start`], torn down with [`PushChannel::stop`] (or on
/// drop). Typed messages are delivered through the `events` sender handed
/// to `start`.
pub struct PushChannel {
    task: JoinHandle<()>,
    out_tx: mpsc::Sender<String>,
    state: Arc<StateCell>,
}

impl PushChannel {
    pub fn start(url: String, policy: ReconnectPolicy, events: mpsc::Sender<PushMessage>) -> Self {
        let (out_tx, out_rx) = mpsc::channel(64);
        let state = Arc::new(StateCell::new());
        let task = tokio::spawn(channel_loop(url, policy, events, state.clone(), out_rx));
        Self { task, out_tx, state }
    }

    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// True once the controller has exhausted its reconnect budget (or was
    /// stopped) and will never deliver again.
    pub fn is_terminated(&self) -> bool {
        self.task.is_finished()
    }

    /// Send a raw text frame to the server. A no-op with a logged warning
    /// when the connection is not currently open — never errors, never
    /// queues for later.
    pub fn send(&self, text: &str) {
        if self.state.get() != ChannelState::Connected {
            warn!("push: send ignored, channel not connected");
            return;
        }
        if self.out_tx.try_send(text.to_string()).is_err() {
            warn!("push: send dropped, outbound buffer unavailable");
        }
    }

    /// Stop the channel for good. No further reconnect attempts are made.
    pub fn stop(self) {
        self.state.set(ChannelState::Disconnected);
        self.task.abort();
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.state.set(ChannelState::Disconnected);
        self.task.abort();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, PartialEq, Eq)]
enum ConnectionEnd {
    /// Server closed or the socket errored; reconnection may follow.
    Closed,
    /// The session side went away; stop without reconnecting.
    OwnerGone,
}

async fn channel_loop(
    url: String,
    policy: ReconnectPolicy,
    events: mpsc::Sender<PushMessage>,
    state: Arc<StateCell>,
    mut out_rx: mpsc::Receiver<String>,
) {
    let mut attempt: u32 = 0;
    loop {
        state.set(ChannelState::Connecting);
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!(url = %url, "push channel connected");
                state.set(ChannelState::Connected);
                // A successful open resets the attempt budget.
                attempt = 0;
                let end = run_connection(ws, &events, &mut out_rx).await;
                state.set(ChannelState::Disconnected);
                if end == ConnectionEnd::OwnerGone {
                    debug!("push channel owner gone; stopping");
                    return;
                }
                warn!("push channel connection closed");
            }
            Err(e) => {
                state.set(ChannelState::Disconnected);
                warn!("push channel connect failed: {}", e);
            }
        }

        attempt += 1;
        if attempt >= policy.max_attempts {
            warn!(
                attempts = attempt,
                "push channel reached the maximum reconnect attempts; giving up"
            );
            return;
        }
        let delay = backoff_delay(policy, attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "push channel reconnecting");
        tokio::time::sleep(delay).await;
    }
}

async fn run_connection(
    ws: WsStream,
    events: &mpsc::Sender<PushMessage>,
    out_rx: &mut mpsc::Receiver<String>,
) -> ConnectionEnd {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Some(msg) = parse_push_message(&text) {
                        if events.send(msg).await.is_err() {
                            return ConnectionEnd::OwnerGone;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Closed,
                Some(Ok(_)) => {
                    // Binary and control frames carry nothing for us.
                }
                Some(Err(e)) => {
                    warn!("push channel read error: {}", e);
                    return ConnectionEnd::Closed;
                }
            },
            outbound = out_rx.recv() => match outbound {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        return ConnectionEnd::Closed;
                    }
                }
                None => return ConnectionEnd::OwnerGone,
            },
        }
    }
}
