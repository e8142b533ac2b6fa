//! Shared fixtures for unit tests: board builders and an in-memory
//! `BoardApi` with scriptable failures and a call journal.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::client::BoardApi;
use crate::errors::SyncError;
use crate::models::{
    ApiMessage, Board, ChangeKind, Column, CreateTaskRequest, PendingChange, Priority, Task,
    TaskStatus, TeamMember, UpdateTaskRequest,
};

pub fn member(id: i64) -> TeamMember {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    TeamMember {
        id,
        name: format!("Member {}", id),
        email: format!("member{}@example.com", id),
        role: "engineer".to_string(),
        active: true,
        response_rate: 0.9,
        last_response_at: None,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn task(id: i64, status: TaskStatus, order: i32) -> Task {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Task {
        id,
        title: format!("Task {}", id),
        description: String::new(),
        status,
        assignee_id: 1,
        assignee: member(1),
        due_date: None,
        priority: Priority::Medium,
        order,
        tags: vec![],
        created_at: ts,
        updated_at: ts,
    }
}

pub fn board(columns: Vec<(TaskStatus, Vec<Task>)>) -> Board {
    Board {
        columns: columns
            .into_iter()
            .map(|(id, tasks)| Column {
                id,
                title: id.title().to_string(),
                color: "neutral".to_string(),
                tasks,
            })
            .collect(),
        last_updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn pending_change(id: i64, kind: ChangeKind, task_id: Option<i64>) -> PendingChange {
    PendingChange {
        id,
        change_type: kind,
        task_id,
        task_data: serde_json::json!({"title": format!("Change {}", id)}),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        approved: false,
    }
}

/// In-memory board server double. Mutations are applied to the held board so
/// the subsequent refetch observes real server-side effects; `fail_updates`
/// makes every `update_task` return a rejected status instead.
pub struct MockApi {
    board: Mutex<Board>,
    pending: Mutex<Vec<PendingChange>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_updates: Mutex<bool>,
    next_id: Mutex<i64>,
}

impl MockApi {
    pub fn new(board_value: Board) -> Self {
        Self {
            board: Mutex::new(board_value),
            pending: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
            fail_updates: Mutex::new(false),
            next_id: Mutex::new(100),
        }
    }

    pub fn with_pending(board_value: Board, pending: Vec<PendingChange>) -> Self {
        let api = Self::new(board_value);
        *api.pending.lock().unwrap() = pending;
        api
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(name))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected(endpoint: &str) -> SyncError {
        SyncError::Rejected {
            endpoint: endpoint.to_string(),
            status: 500,
            message: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl BoardApi for MockApi {
    async fn fetch_board(&self) -> Result<Board, SyncError> {
        self.record("fetch_board".to_string());
        Ok(self.board.lock().unwrap().clone())
    }

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, SyncError> {
        self.record(format!("create_task:{}", req.title));
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        let mut created = task(id, req.status, 0);
        created.title = req.title.clone();
        created.priority = req.priority;

        let mut board = self.board.lock().unwrap();
        if let Some(column) = board.columns.iter_mut().find(|c| c.id == req.status) {
            created.order = column.tasks.len() as i32;
            column.tasks.push(created.clone());
        }
        Ok(created)
    }

    async fn update_task(&self, id: i64, patch: &UpdateTaskRequest) -> Result<Task, SyncError> {
        self.record(format!("update_task:{}", id));
        if *self.fail_updates.lock().unwrap() {
            return Err(Self::rejected(&format!("/kanban/tasks/{}", id)));
        }
        let mut board = self.board.lock().unwrap();
        if let Some(status) = patch.status {
            let mut detached = None;
            for column in board.columns.iter_mut() {
                if let Some(pos) = column.tasks.iter().position(|t| t.id == id) {
                    detached = Some(column.tasks.remove(pos));
                    break;
                }
            }
            let mut moved = detached.ok_or(SyncError::Rejected {
                endpoint: format!("/kanban/tasks/{}", id),
                status: 404,
                message: "Task not found".to_string(),
            })?;
            moved.status = status;
            if let Some(column) = board.columns.iter_mut().find(|c| c.id == status) {
                moved.order = column.tasks.len() as i32;
                column.tasks.push(moved.clone());
            }
            return Ok(moved);
        }
        let found = board
            .columns
            .iter_mut()
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| t.id == id)
            .ok_or(SyncError::Rejected {
                endpoint: format!("/kanban/tasks/{}", id),
                status: 404,
                message: "Task not found".to_string(),
            })?;
        if let Some(title) = &patch.title {
            found.title = title.clone();
        }
        if let Some(priority) = patch.priority {
            found.priority = priority;
        }
        Ok(found.clone())
    }

    async fn delete_task(&self, id: i64) -> Result<ApiMessage, SyncError> {
        self.record(format!("delete_task:{}", id));
        // Deletion is queued for approval, not applied.
        self.pending
            .lock()
            .unwrap()
            .push(pending_change(id + 1000, ChangeKind::Delete, Some(id)));
        Ok(ApiMessage {
            success: true,
            message: "Task deletion queued for approval".to_string(),
        })
    }

    async fn pending_changes(&self) -> Result<Vec<PendingChange>, SyncError> {
        self.record("pending_changes".to_string());
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn approve_changes(&self, ids: &[i64]) -> Result<ApiMessage, SyncError> {
        self.record(format!("approve_changes:{:?}", ids));
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|c| !ids.contains(&c.id));
        Ok(ApiMessage {
            success: true,
            message: format!("Approved {} kanban changes", before - pending.len()),
        })
    }

    async fn board_summary(&self) -> Result<String, SyncError> {
        self.record("board_summary".to_string());
        let board = self.board.lock().unwrap();
        Ok(format!("Total Tasks: {}", board.task_count()))
    }
}
