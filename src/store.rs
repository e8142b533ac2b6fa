//! In-memory board cache — the single source of truth for rendering.
//!
//! The cache is only ever updated two ways: `replace()` swaps in a full
//! authoritative snapshot from the server, and `begin_move()` applies an
//! optimistic column move ahead of the remote call. Optimistic moves are
//! tracked in a command log keyed by task id. On `replace()`, committed or
//! already-visible moves are dropped and still-pending moves are re-applied
//! on top of the fresh columns.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::SyncError;
use crate::models::{Board, Column, Task, TaskStatus};

/// Lifecycle of an optimistic move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    /// Applied locally, remote call not yet resolved.
    Pending,
    /// Remote call succeeded; waiting for the next snapshot to confirm.
    Committed,
}

#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub id: Uuid,
    pub task_id: i64,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub state: MoveState,
}

#[derive(Default)]
struct StoreInner {
    columns: Vec<Column>,
    last_synced: Option<DateTime<Utc>>,
    moves: HashMap<i64, MoveCommand>,
}

#[derive(Default)]
pub struct BoardStore {
    inner: Mutex<StoreInner>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<MutexGuard<'_, StoreInner>, SyncError> {
        self.inner
            .lock()
            .map_err(|_| SyncError::Other(anyhow!("board store lock poisoned")))
    }

    /// Last-known-consistent column list, for rendering.
    pub fn columns(&self) -> Result<Vec<Column>, SyncError> {
        Ok(self.locked()?.columns.clone())
    }

    pub fn last_synced(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self.locked()?.last_synced)
    }

    pub fn find_task(&self, id: i64) -> Result<Option<Task>, SyncError> {
        let inner = self.locked()?;
        Ok(find_in_columns(&inner.columns, id).cloned())
    }

    pub fn task_status(&self, id: i64) -> Result<Option<TaskStatus>, SyncError> {
        let inner = self.locked()?;
        Ok(find_in_columns(&inner.columns, id).map(|t| t.status))
    }

    /// Outstanding optimistic move commands, oldest state first is not
    /// guaranteed — keyed by task id.
    pub fn move_log(&self) -> Result<Vec<MoveCommand>, SyncError> {
        Ok(self.locked()?.moves.values().cloned().collect())
    }

    /// Atomically swap in a fresh authoritative snapshot, then reconcile the
    /// move log against it. No partial merge ever happens here.
    pub fn replace(&self, board: Board) -> Result<(), SyncError> {
        let mut guard = self.locked()?;
        let inner = &mut *guard;
        inner.columns = board.columns;
        inner.last_synced = Some(board.last_updated);

        let mut still_pending = Vec::new();
        for (task_id, command) in inner.moves.drain() {
            match command.state {
                // The snapshot is authoritative for anything already
                // confirmed by the server.
                MoveState::Committed => {}
                MoveState::Pending => {
                    let current = find_in_columns(&inner.columns, task_id).map(|t| t.status);
                    match current {
                        // Server already reflects the move, or the task is
                        // gone entirely — nothing left to re-apply.
                        Some(status) if status == command.to => {}
                        None => {}
                        Some(_) => still_pending.push(command),
                    }
                }
            }
        }
        for command in still_pending {
            debug!(task_id = command.task_id, to = %command.to, "re-applying in-flight move onto snapshot");
            splice_move(&mut inner.columns, command.task_id, command.to);
            inner.moves.insert(command.task_id, command);
        }
        Ok(())
    }

    /// Apply an optimistic move: remove the task from its current column,
    /// append it to the target column, and record a pending command. A
    /// second move of the same task before the first resolves replaces the
    /// earlier command — the later intent wins locally and the next refetch
    /// converges either way.
    pub fn begin_move(&self, task_id: i64, to: TaskStatus) -> Result<MoveCommand, SyncError> {
        let mut inner = self.locked()?;
        let from = find_in_columns(&inner.columns, task_id)
            .map(|t| t.status)
            .ok_or(SyncError::StaleReference { id: task_id })?;
        splice_move(&mut inner.columns, task_id, to);
        let command = MoveCommand {
            id: Uuid::new_v4(),
            task_id,
            from,
            to,
            state: MoveState::Pending,
        };
        inner.moves.insert(task_id, command.clone());
        Ok(command)
    }

    /// Mark a pending move as confirmed by the server. The command is kept
    /// until the confirming refetch lands.
    pub fn commit_move(&self, task_id: i64) -> Result<(), SyncError> {
        let mut inner = self.locked()?;
        if let Some(command) = inner.moves.get_mut(&task_id) {
            command.state = MoveState::Committed;
        }
        Ok(())
    }

    /// Drop a move command after a failed remote call. The visible rollback
    /// happens through the corrective refetch that follows every failure.
    pub fn abandon_move(&self, task_id: i64) -> Result<(), SyncError> {
        self.locked()?.moves.remove(&task_id);
        Ok(())
    }
}

fn find_in_columns(columns: &[Column], id: i64) -> Option<&Task> {
    columns.iter().flat_map(|c| c.tasks.iter()).find(|t| t.id == id)
}

/// Move a task between columns in place: detach it wherever it lives and
/// append it to the target column with its status and order updated.
fn splice_move(columns: &mut Vec<Column>, task_id: i64, to: TaskStatus) {
    let mut moved: Option<Task> = None;
    for column in columns.iter_mut() {
        if let Some(pos) = column.tasks.iter().position(|t| t.id == task_id) {
            moved = Some(column.tasks.remove(pos));
            break;
        }
    }
    let Some(mut task) = moved else { return };
    task.status = to;
    if let Some(target) = columns.iter_mut().find(|c| c.id == to) {
        task.order = target.tasks.len() as i32;
        target.tasks.push(task);
    } else {
        // Servers always send the full column set; tolerate a sparse
        // snapshot by materializing the target column.
        task.order = 0;
        columns.push(Column {
            id: to,
            title: to.title().to_string(),
            color: "neutral".to_string(),
            tasks: vec![task],
        });
    }
}
