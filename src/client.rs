//! REST transport client for the board backend.
//!
//! `BoardApi` is the seam between the sync core and the wire: the
//! coordinator and approval gate only ever see the trait, so tests can
//! substitute an in-memory implementation. `HttpBoardApi` is the production
//! implementation over `reqwest`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::models::{ApiMessage, Board, CreateTaskRequest, PendingChange, Task, UpdateTaskRequest};

#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn fetch_board(&self) -> Result<Board, SyncError>;
    async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, SyncError>;
    async fn update_task(&self, id: i64, patch: &UpdateTaskRequest) -> Result<Task, SyncError>;
    /// The server queues deletions as pending changes rather than applying
    /// them; the returned message says so.
    async fn delete_task(&self, id: i64) -> Result<ApiMessage, SyncError>;
    async fn pending_changes(&self) -> Result<Vec<PendingChange>, SyncError>;
    async fn approve_changes(&self, ids: &[i64]) -> Result<ApiMessage, SyncError>;
    async fn board_summary(&self) -> Result<String, SyncError>;
}

// ── Response envelopes ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PendingChangesEnvelope {
    data: PendingChangesData,
}

#[derive(Debug, Deserialize)]
struct PendingChangesData {
    changes: Vec<PendingChange>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    data: SummaryData,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    summary: String,
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

// ── HTTP implementation ──────────────────────────────────────────────

pub struct HttpBoardApi {
    http: reqwest::Client,
    base: String,
}

impl HttpBoardApi {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| SyncError::Transport {
                endpoint: config.api_base.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base: config.api_base.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/kanban/{}", self.base, path)
    }

    /// Map a non-2xx response to `Rejected`, extracting the backend's
    /// `detail` message when the body carries one.
    async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(SyncError::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let endpoint = self.endpoint(path);
        let resp = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Self::check(&endpoint, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|source| SyncError::Transport { endpoint, source })
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T, SyncError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let endpoint = self.endpoint(path);
        let resp = self
            .http
            .request(method, &endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Self::check(&endpoint, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|source| SyncError::Transport { endpoint, source })
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn fetch_board(&self) -> Result<Board, SyncError> {
        self.get_json("board").await
    }

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, SyncError> {
        self.send_json(reqwest::Method::POST, "tasks", req).await
    }

    async fn update_task(&self, id: i64, patch: &UpdateTaskRequest) -> Result<Task, SyncError> {
        self.send_json(reqwest::Method::PUT, &format!("tasks/{}", id), patch)
            .await
    }

    async fn delete_task(&self, id: i64) -> Result<ApiMessage, SyncError> {
        let endpoint = self.endpoint(&format!("tasks/{}", id));
        let resp = self
            .http
            .delete(&endpoint)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Self::check(&endpoint, resp)
            .await?
            .json::<ApiMessage>()
            .await
            .map_err(|source| SyncError::Transport { endpoint, source })
    }

    async fn pending_changes(&self) -> Result<Vec<PendingChange>, SyncError> {
        let envelope: PendingChangesEnvelope = self.get_json("pending-changes").await?;
        Ok(envelope.data.changes)
    }

    async fn approve_changes(&self, ids: &[i64]) -> Result<ApiMessage, SyncError> {
        // The approval endpoint takes a bare id array, not an object.
        self.send_json(reqwest::Method::POST, "approve-changes", ids)
            .await
    }

    async fn board_summary(&self) -> Result<String, SyncError> {
        let envelope: SummaryEnvelope = self.get_json("summary").await?;
        Ok(envelope.data.summary)
    }
}
