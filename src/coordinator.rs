//! Mutation coordinator — the single write path onto the board cache.
//!
//! Every operation converges on server truth through a full refetch rather
//! than trusting local patches: after any successful remote call (and after
//! any failed one) the coordinator fetches the authoritative board and
//! swaps it in wholesale. Only `move_task` mutates the cache before its
//! remote call resolves, so drag interactions feel instantaneous.
//!
//! Approval semantics, as the backend implements them: create and update
//! apply immediately on the server (change entries are still recorded for
//! the audit trail), while **delete is queued as a pending change** and
//! leaves the board untouched until a manager approves it. `delete_task`
//! returns the server's acknowledgement so callers can surface it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::BoardApi;
use crate::errors::SyncError;
use crate::models::{ApiMessage, CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest};
use crate::store::BoardStore;

/// Result of a `move_task` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The task was already in the target column; no remote call was issued
    /// and the cache was left untouched.
    AlreadyThere,
}

pub struct MutationCoordinator {
    api: Arc<dyn BoardApi>,
    store: Arc<BoardStore>,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn BoardApi>, store: Arc<BoardStore>) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    /// Fetch the authoritative board and replace the cache with it.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let board = self.api.fetch_board().await?;
        self.store.replace(board)
    }

    /// Refetch after a failed mutation so the cache cannot stay in a state
    /// the server never produced. Best effort: a refetch failure is logged
    /// and the original error still wins.
    async fn recover(&self) {
        if let Err(e) = self.refresh().await {
            warn!("corrective refetch failed: {}", e);
        }
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, SyncError> {
        match self.api.create_task(req).await {
            Ok(created) => {
                self.refresh().await?;
                Ok(created)
            }
            Err(e) => {
                if e.requires_refetch() {
                    self.recover().await;
                }
                Err(e)
            }
        }
    }

    pub async fn update_task(&self, id: i64, patch: &UpdateTaskRequest) -> Result<Task, SyncError> {
        if self.store.task_status(id)?.is_none() {
            return Err(SyncError::StaleReference { id });
        }
        match self.api.update_task(id, patch).await {
            Ok(updated) => {
                self.refresh().await?;
                Ok(updated)
            }
            Err(e) => {
                if e.requires_refetch() {
                    self.recover().await;
                }
                Err(e)
            }
        }
    }

    pub async fn delete_task(&self, id: i64) -> Result<ApiMessage, SyncError> {
        if self.store.task_status(id)?.is_none() {
            return Err(SyncError::StaleReference { id });
        }
        match self.api.delete_task(id).await {
            Ok(ack) => {
                // The task stays on the board until the deletion is
                // approved; the refetch reflects whatever the server did.
                self.refresh().await?;
                Ok(ack)
            }
            Err(e) => {
                if e.requires_refetch() {
                    self.recover().await;
                }
                Err(e)
            }
        }
    }

    /// Move a task to another column with an optimistic local patch. Moving
    /// a task onto its current column is a no-op: no remote call, no cache
    /// mutation.
    pub async fn move_task(&self, id: i64, new_status: TaskStatus) -> Result<MoveOutcome, SyncError> {
        let current = self
            .store
            .task_status(id)?
            .ok_or(SyncError::StaleReference { id })?;
        if current == new_status {
            debug!(task_id = id, status = %new_status, "move to current column ignored");
            return Ok(MoveOutcome::AlreadyThere);
        }

        self.store.begin_move(id, new_status)?;
        match self
            .api
            .update_task(id, &UpdateTaskRequest::status_only(new_status))
            .await
        {
            Ok(_) => {
                self.store.commit_move(id)?;
                self.refresh().await?;
                Ok(MoveOutcome::Moved)
            }
            Err(e) => {
                self.store.abandon_move(id)?;
                if e.requires_refetch() {
                    self.recover().await;
                }
                Err(e)
            }
        }
    }
}
