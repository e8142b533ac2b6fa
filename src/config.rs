use std::time::Duration;

/// Runtime configuration for a board sync session.
///
/// Values resolve in order: explicit CLI flags, then `BOARD_API_URL` /
/// `BOARD_WS_URL` environment variables, then defaults. The WebSocket URL is
/// derived from the API base when not given explicitly, so a plain
/// `BOARD_API_URL=http://host:8000` is enough to point a session at a
/// different backend.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the REST API, without the `/kanban/...` suffix.
    pub api_base: String,
    /// URL of the push-update WebSocket endpoint.
    pub ws_url: String,
    pub request_timeout: Duration,
    /// Base delay for the linear reconnect backoff (attempt N waits N times
    /// this long).
    pub reconnect_base_delay: Duration,
    /// Reconnect attempts before the push channel fails permanently.
    pub max_reconnect_attempts: u32,
}

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
const WS_PATH: &str = "/ws/agent-updates";

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ws_url: derive_ws_url(DEFAULT_API_BASE),
            request_timeout: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
        }
    }
}

impl SyncConfig {
    /// Resolve configuration from CLI overrides and the process environment.
    pub fn resolve(api_url: Option<String>, ws_url: Option<String>) -> Self {
        Self::from_vars(
            api_url.or_else(|| std::env::var("BOARD_API_URL").ok()),
            ws_url.or_else(|| std::env::var("BOARD_WS_URL").ok()),
        )
    }

    /// Pure constructor used by `resolve` and by tests.
    pub fn from_vars(api_url: Option<String>, ws_url: Option<String>) -> Self {
        let api_base = api_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let ws_url = ws_url.unwrap_or_else(|| derive_ws_url(&api_base));
        Self {
            api_base,
            ws_url,
            ..Self::default()
        }
    }
}

/// Derive the push endpoint from an API base: swap the scheme to ws(s) and
/// replace the `/api` suffix with the WebSocket path.
fn derive_ws_url(api_base: &str) -> String {
    let host = api_base
        .trim_end_matches('/')
        .trim_end_matches("/api")
        .to_string();
    let host = if let Some(rest) = host.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", host)
    };
    format!("{}{}", host, WS_PATH)
}
