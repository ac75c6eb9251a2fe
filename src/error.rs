//! Launch failures and their translation into HTTP error responses.

use crate::types::{ErrorCode, ErrorPayload};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Message used when a failure carries nothing diagnosable.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unexpected error occurred while launching devbox";

pub type Result<T> = std::result::Result<T, LaunchError>;

/// Remote operation that was in flight when a launch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStep {
    CreateDevbox,
    AwaitRunning,
    ExecuteAsync,
    CreateTunnel,
    Shutdown,
}

impl fmt::Display for LaunchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateDevbox => "create_devbox",
            Self::AwaitRunning => "await_running",
            Self::ExecuteAsync => "execute_async",
            Self::CreateTunnel => "create_tunnel",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("agentId is required. Please provide it in the request body or set RUNLOOP_DEFAULT_AGENT_ID environment variable")]
    MissingAgentId,

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    InvalidBody(String),

    /// Runloop answered with a non-success status. `message` is the
    /// service's own text, or the status code when it sent none.
    #[error("{message}")]
    Api {
        step: LaunchStep,
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("{source}")]
    Transport {
        step: LaunchStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("devbox {devbox_id} entered status {status} before running")]
    DevboxNotRunning { devbox_id: String, status: String },

    #[error("devbox {devbox_id} did not reach running state within {timeout:?}")]
    AwaitTimeout { devbox_id: String, timeout: Duration },

    /// A step after provisioning failed; the devbox may still be running.
    #[error("{source}")]
    AfterProvision {
        devbox_id: String,
        shut_down: bool,
        #[source]
        source: Box<LaunchError>,
    },
}

impl LaunchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAgentId => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic fields attached to `DEVBOX_LAUNCH_ERROR` payloads.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::MissingAgentId | Self::Config(_) | Self::InvalidBody(_) => None,
            Self::Api {
                step, status, body, ..
            } => Some(json!({ "step": step, "status": status, "body": body })),
            Self::Transport { step, source } => Some(json!({
                "step": step,
                "kind": "transport",
                "timeout": source.is_timeout(),
            })),
            Self::DevboxNotRunning { devbox_id, status } => Some(json!({
                "step": LaunchStep::AwaitRunning,
                "devboxId": devbox_id,
                "status": status,
            })),
            Self::AwaitTimeout { devbox_id, timeout } => Some(json!({
                "step": LaunchStep::AwaitRunning,
                "devboxId": devbox_id,
                "timeoutMs": timeout.as_millis() as u64,
            })),
            Self::AfterProvision {
                devbox_id,
                shut_down,
                source,
            } => {
                let mut map = match source.details() {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                map.insert("devboxId".to_string(), Value::String(devbox_id.clone()));
                map.insert("shutDown".to_string(), Value::Bool(*shut_down));
                Some(Value::Object(map))
            }
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        if matches!(self, Self::MissingAgentId) {
            return ErrorPayload {
                message: self.to_string(),
                code: ErrorCode::MissingAgentId,
                details: None,
            };
        }

        // A provisioned devbox is always reported, even when nothing else is known.
        let message = self.to_string();
        if message.trim().is_empty() {
            let details = match self {
                Self::AfterProvision { .. } => self.details(),
                _ => None,
            };
            return ErrorPayload {
                message: UNKNOWN_ERROR_MESSAGE.to_string(),
                code: ErrorCode::UnknownError,
                details,
            };
        }

        ErrorPayload {
            message,
            code: ErrorCode::DevboxLaunchError,
            details: self.details(),
        }
    }
}

impl IntoResponse for LaunchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = self.to_payload();

        if status.is_client_error() {
            warn!(code = ?payload.code, "Rejected launch request: {}", payload.message);
        } else {
            error!(code = ?payload.code, details = ?payload.details, "Error launching devbox: {}", self);
        }

        (status, Json(payload)).into_response()
    }
}
