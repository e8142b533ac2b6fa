//! Typed error hierarchy for the board sync core.
//!
//! One enum covers the three failure families the sync layer distinguishes:
//! transport failures (request failed or non-2xx, surfaced to the user and
//! followed by a corrective refetch), stale references (mutation targets an
//! id the cache does not hold — reported, no remote call issued), and push
//! channel failures (logged only, drive the reconnection state machine).
//! Nothing here is fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server rejected {endpoint} with status {status}: {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Task {id} is not present on the local board")]
    StaleReference { id: i64 },

    #[error("Push channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// True for failures where the coordinator must discard optimistic local
    /// state and refetch the authoritative board.
    pub fn requires_refetch(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Rejected { .. })
    }
}
