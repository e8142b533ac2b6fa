//! boardsync — task board state reconciliation and real-time sync client.
//!
//! ## Overview
//!
//! The board rendered to a user is pulled between three concurrent
//! influences: their own drag-and-drop edits, server-side CRUD results, and
//! push notifications from an automation agent that proposes changes parsed
//! out of email. boardsync keeps those consistent with a deliberately
//! simple contract: optimistic patches for drags, a full authoritative
//! refetch after every mutation, and an approval gate that keeps
//! agent-proposed changes off the live board until a manager says so.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  REST    ┌──────────────────────────────────────────────┐
//! │  Board   │ <──────> │  client.rs   (BoardApi trait, HttpBoardApi)  │
//! │  server  │          │      │                                       │
//! └──────────┘          │      │ create/update/delete/move + refetch   │
//!      │ WebSocket      │      v                                       │
//!      │                │  coordinator.rs  (MutationCoordinator)       │
//!      v                │      │                                       │
//! channel.rs            │      v                                       │
//! (PushChannel,         │  store.rs   (BoardStore, move command log)   │
//!  PushMessage)         │      ^                                       │
//!      │                │      │ move intents                          │
//!      v                │  drag.rs    (DragController, drop zones)     │
//! session.rs ───────────│  gate.rs    (ApprovalGate, pending changes)  │
//! (BoardSession,        └──────────────────────────────────────────────┘
//!  dispatch loop)
//! ```
//!
//! | Module        | Responsibility                                        |
//! |---------------|-------------------------------------------------------|
//! | `models`      | Wire types: `Task`, `Column`, `Board`, `PendingChange`|
//! | `errors`      | `SyncError` taxonomy (transport/stale/channel)        |
//! | `config`      | `SyncConfig` defaults + env/CLI resolution            |
//! | `client`      | REST transport behind the `BoardApi` seam             |
//! | `store`       | Board cache; optimistic moves reconciled on refetch   |
//! | `coordinator` | Mutations, each converging via a full refetch         |
//! | `drag`        | Gesture state machine + hybrid collision detection    |
//! | `gate`        | Pending agent changes and explicit approval           |
//! | `channel`     | Reconnecting push connection, typed message boundary  |
//! | `session`     | Mount/unmount wiring, dispatch loop, activity log     |

pub mod channel;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod drag;
pub mod errors;
pub mod gate;
pub mod models;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;
