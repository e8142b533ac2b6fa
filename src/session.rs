//! Board session — lifecycle-scoped wiring of the whole sync core.
//!
//! A session is created when a board view mounts and shut down when it
//! unmounts. It owns the store, the coordinator, the approval gate, the
//! push channel, and the dispatch loop that routes each typed push message
//! to exactly one sink: board refetch, pending-list refetch, or the
//! activity log. Shutdown aborts the channel and dispatch tasks; in-flight
//! REST calls are not cancelled, but every response path ends in a full
//! refetch so a late reply cannot wedge the cache.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::channel::{ChannelState, Dispatch, PushChannel, PushMessage, ReconnectPolicy};
use crate::client::{BoardApi, HttpBoardApi};
use crate::config::SyncConfig;
use crate::coordinator::MutationCoordinator;
use crate::errors::SyncError;
use crate::gate::ApprovalGate;
use crate::store::BoardStore;

// ── Activity log ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Default)]
struct ActivityInner {
    entries: VecDeque<ActivityEntry>,
    /// All-time push count, so readers can tell how many entries they have
    /// missed even after the ring evicted them.
    total: usize,
}

/// Bounded ring of recent agent/status events. Best-effort: a poisoned lock
/// degrades to dropping entries rather than failing the session.
pub struct ActivityLog {
    inner: Mutex<ActivityInner>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ActivityInner::default()),
            capacity,
        }
    }

    pub fn push(&self, message: String) {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("activity log lock poisoned; entry dropped");
            return;
        };
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(ActivityEntry {
            at: Utc::now(),
            message,
        });
        inner.total += 1;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All-time number of entries pushed, including evicted ones.
    pub fn total(&self) -> usize {
        self.inner.lock().map(|i| i.total).unwrap_or(0)
    }

    /// Most recent entries, newest last.
    pub fn recent(&self, n: usize) -> Vec<ActivityEntry> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner.entries.iter().rev().take(n).rev().cloned().collect()
    }
}

// ── Session ──────────────────────────────────────────────────────────

pub struct BoardSession {
    store: Arc<BoardStore>,
    coordinator: Arc<MutationCoordinator>,
    gate: Arc<ApprovalGate>,
    activity: Arc<ActivityLog>,
    channel: PushChannel,
    dispatch: JoinHandle<()>,
}

const ACTIVITY_CAPACITY: usize = 100;

impl BoardSession {
    /// Mount a session against the configured backend: initial board and
    /// pending fetches, then the push channel and its dispatch loop.
    pub async fn start(config: &SyncConfig) -> Result<Self, SyncError> {
        let api: Arc<dyn BoardApi> = Arc::new(HttpBoardApi::new(config)?);
        Self::start_with_api(config, api).await
    }

    /// Mount with an explicit transport, for tests and embedding.
    pub async fn start_with_api(
        config: &SyncConfig,
        api: Arc<dyn BoardApi>,
    ) -> Result<Self, SyncError> {
        let store = Arc::new(BoardStore::new());
        let coordinator = Arc::new(MutationCoordinator::new(api.clone(), store.clone()));
        let gate = Arc::new(ApprovalGate::new(api));
        coordinator.refresh().await?;
        gate.refresh().await?;

        let activity = Arc::new(ActivityLog::new(ACTIVITY_CAPACITY));
        let (events_tx, events_rx) = mpsc::channel(64);
        let channel = PushChannel::start(
            config.ws_url.clone(),
            ReconnectPolicy::from(config),
            events_tx,
        );
        let dispatch = tokio::spawn(dispatch_loop(
            events_rx,
            coordinator.clone(),
            gate.clone(),
            activity.clone(),
        ));

        Ok(Self {
            store,
            coordinator,
            gate,
            activity,
            channel,
            dispatch,
        })
    }

    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<MutationCoordinator> {
        &self.coordinator
    }

    pub fn gate(&self) -> &Arc<ApprovalGate> {
        &self.gate
    }

    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Unmount: stop the push channel and the dispatch loop.
    pub async fn shutdown(self) {
        self.channel.stop();
        self.dispatch.abort();
    }
}

/// Route each push message to its single sink. Refresh failures are logged
/// and swallowed — the channel is a convenience layer, and the next
/// user-driven mutation refetches anyway.
pub(crate) async fn dispatch_loop(
    mut events: mpsc::Receiver<PushMessage>,
    coordinator: Arc<MutationCoordinator>,
    gate: Arc<ApprovalGate>,
    activity: Arc<ActivityLog>,
) {
    while let Some(msg) = events.recv().await {
        match msg.dispatch() {
            Dispatch::Board => {
                if let Err(e) = coordinator.refresh().await {
                    warn!("push-driven board refresh failed: {}", e);
                }
            }
            Dispatch::Approvals => {
                if let Err(e) = gate.refresh().await {
                    warn!("push-driven pending refresh failed: {}", e);
                }
            }
            Dispatch::Activity => activity.push(msg.describe()),
        }
    }
}
