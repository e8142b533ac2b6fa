//! Approval gate for agent-proposed board changes.
//!
//! Changes proposed by the automation agent live in their own list, fetched
//! from a separate endpoint and never merged into the board cache
//! automatically — they are advisory until a manager approves them.
//! Approval is always explicit and the id list caller-supplied, so partial
//! approval works.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use tracing::debug;

use crate::client::BoardApi;
use crate::coordinator::MutationCoordinator;
use crate::errors::SyncError;
use crate::models::{ApiMessage, PendingChange};

pub struct ApprovalGate {
    api: Arc<dyn BoardApi>,
    pending: Mutex<Vec<PendingChange>>,
}

impl ApprovalGate {
    pub fn new(api: Arc<dyn BoardApi>) -> Self {
        Self {
            api,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, Vec<PendingChange>>, SyncError> {
        self.pending
            .lock()
            .map_err(|_| SyncError::Other(anyhow!("approval gate lock poisoned")))
    }

    /// Refetch the pending-change list from the server.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let changes = self.api.pending_changes().await?;
        debug!(count = changes.len(), "pending changes refreshed");
        *self.locked()? = changes;
        Ok(())
    }

    pub fn pending(&self) -> Result<Vec<PendingChange>, SyncError> {
        Ok(self.locked()?.clone())
    }

    pub fn pending_count(&self) -> Result<usize, SyncError> {
        Ok(self.locked()?.len())
    }

    /// Approve the given change ids, then refetch the board (newly approved
    /// changes become visible) and the pending list (approved entries drop
    /// out). An empty id list issues no remote call.
    pub async fn approve(
        &self,
        ids: &[i64],
        coordinator: &MutationCoordinator,
    ) -> Result<ApiMessage, SyncError> {
        if ids.is_empty() {
            return Ok(ApiMessage {
                success: true,
                message: "No changes to approve".to_string(),
            });
        }
        let ack = self.api.approve_changes(ids).await?;
        coordinator.refresh().await?;
        self.refresh().await?;
        Ok(ack)
    }
}
