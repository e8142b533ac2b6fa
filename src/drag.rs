//! Drag interaction layer — turns pointer gestures into move intents.
//!
//! Collision detection is a two-stage hybrid: pointer containment decides
//! the common case precisely, and the closest-center fallback covers fast
//! drags where the pointer briefly leaves every drop zone (typically
//! between adjacent narrow columns). Containment always wins over
//! proximity, and the first containing zone wins ties deterministically.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::coordinator::{MoveOutcome, MutationCoordinator};
use crate::errors::SyncError;
use crate::models::TaskStatus;
use crate::store::BoardStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// A column's droppable area in screen coordinates.
#[derive(Debug, Clone, Copy)]
pub struct DropZone {
    pub status: TaskStatus,
    pub bounds: Rect,
}

/// Resolve the drop target for a pointer position.
///
/// Stage one: the first zone whose bounds contain the pointer. Stage two:
/// the zone whose center is closest to the pointer. Returns `None` only
/// when there are no zones at all.
pub fn resolve_drop_target(zones: &[DropZone], pointer: Point) -> Option<TaskStatus> {
    if let Some(zone) = zones.iter().find(|z| z.bounds.contains(pointer)) {
        return Some(zone.status);
    }
    zones
        .iter()
        .min_by(|a, b| {
            squared_distance(a.bounds.center(), pointer)
                .total_cmp(&squared_distance(b.bounds.center(), pointer))
        })
        .map(|z| z.status)
}

fn squared_distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { task_id: i64, from: TaskStatus },
}

/// What a completed drop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved(TaskStatus),
    /// Dropped on the column the task already occupies.
    Unchanged,
    /// No drop zones were available to resolve a target.
    NoTarget,
    /// `drop_at` was called without an active drag.
    NotDragging,
}

/// Per-gesture drag state machine: idle → dragging → (dropped | cancelled)
/// → idle.
pub struct DragController {
    state: DragState,
    store: Arc<BoardStore>,
}

impl DragController {
    pub fn new(store: Arc<BoardStore>) -> Self {
        Self {
            state: DragState::Idle,
            store,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Start dragging a task. Unknown ids leave the controller idle.
    pub fn begin(&mut self, task_id: i64) -> Result<bool, SyncError> {
        match self.store.task_status(task_id)? {
            Some(from) => {
                self.state = DragState::Dragging { task_id, from };
                Ok(true)
            }
            None => {
                warn!(task_id, "drag start ignored: task not on the board");
                Ok(false)
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.state != DragState::Idle {
            debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Finish the gesture at `pointer`, resolving the target column and
    /// issuing the move when it differs from the task's current column. The
    /// controller returns to idle whatever happens.
    pub async fn drop_at(
        &mut self,
        pointer: Point,
        zones: &[DropZone],
        coordinator: &MutationCoordinator,
    ) -> Result<DropOutcome, SyncError> {
        let DragState::Dragging { task_id, .. } = self.state else {
            return Ok(DropOutcome::NotDragging);
        };
        self.state = DragState::Idle;

        let Some(target) = resolve_drop_target(zones, pointer) else {
            debug!(task_id, "drop resolved no target");
            return Ok(DropOutcome::NoTarget);
        };

        match coordinator.move_task(task_id, target).await? {
            MoveOutcome::Moved => Ok(DropOutcome::Moved(target)),
            MoveOutcome::AlreadyThere => Ok(DropOutcome::Unchanged),
        }
    }
}
