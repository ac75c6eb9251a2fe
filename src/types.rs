//! Request, response and error payload types for the launch endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of `POST /api/runloop/launch-devbox`. Every field falls back to a
/// configured default when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

/// Successful launch: where the agent is reachable and how to chat with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResult {
    pub tunnel_url: String,
    pub devbox_id: String,
    pub chat_url: String,
}

/// Fully resolved launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevboxConfig {
    pub agent_id: String,
    pub command: String,
    pub port: u16,
    pub assistant_id: String,
    /// Devbox env var name -> stored secret name.
    pub secrets: BTreeMap<String, String>,
}

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingAgentId,
    DevboxLaunchError,
    UnknownError,
}

/// Error body returned with 400/500 responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub message: String,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
