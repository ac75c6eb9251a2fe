//! Minimal typed client for the Runloop devbox REST API.

use crate::error::{LaunchError, LaunchStep, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

// Request/Response types
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mount {
    AgentMount {
        agent_id: String,
        agent_name: Option<String>,
        agent_path: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDevboxRequest {
    pub mounts: Vec<Mount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DevboxStatus {
    Provisioning,
    Initializing,
    Running,
    Suspending,
    Suspended,
    Resuming,
    Failure,
    Shutdown,
    #[serde(other)]
    Unknown,
}

impl DevboxStatus {
    /// States a devbox never leaves on its way to running.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failure | Self::Shutdown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Suspending => "suspending",
            Self::Suspended => "suspended",
            Self::Resuming => "resuming",
            Self::Failure => "failure",
            Self::Shutdown => "shutdown",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevboxView {
    pub id: String,
    pub status: DevboxStatus,
}

#[derive(Serialize)]
struct ExecuteAsyncRequest<'a> {
    command: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionView {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Serialize)]
struct CreateTunnelRequest {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TunnelView {
    pub url: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Authenticated handle on the Runloop API.
#[derive(Clone)]
pub struct RunloopClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl RunloopClient {
    /// Fails with a configuration error when no API key is configured.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<&SecretString>,
    ) -> Result<Self> {
        let api_key = api_key.filter(|key| !key.expose_secret().is_empty()).ok_or_else(|| {
            LaunchError::Config(
                "RUNLOOP_API_KEY environment variable is required but not set".to_string(),
            )
        })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        step: LaunchStep,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|source| LaunchError::Transport { step, source })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(step, status.as_u16(), &text));
        }

        response
            .json::<T>()
            .await
            .map_err(|source| LaunchError::Transport { step, source })
    }

    pub async fn create_devbox(&self, request: &CreateDevboxRequest) -> Result<DevboxView> {
        self.send(
            LaunchStep::CreateDevbox,
            self.http.post(self.url("/v1/devboxes")).json(request),
        )
        .await
    }

    pub async fn get_devbox(&self, devbox_id: &str) -> Result<DevboxView> {
        self.send(
            LaunchStep::AwaitRunning,
            self.http.get(self.url(&format!("/v1/devboxes/{}", devbox_id))),
        )
        .await
    }

    /// Poll a freshly created devbox until it is running. Any error here
    /// leaves the devbox provisioned.
    pub async fn await_running(
        &self,
        mut devbox: DevboxView,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<DevboxView> {
        let started = Instant::now();
        loop {
            match devbox.status {
                DevboxStatus::Running => return Ok(devbox),
                status if status.is_terminal() => {
                    return Err(LaunchError::DevboxNotRunning {
                        devbox_id: devbox.id,
                        status: status.as_str().to_string(),
                    });
                }
                _ => {}
            }

            if started.elapsed() >= timeout {
                return Err(LaunchError::AwaitTimeout {
                    devbox_id: devbox.id,
                    timeout,
                });
            }

            tokio::time::sleep(poll_interval).await;
            devbox = self.get_devbox(&devbox.id).await?;
            debug!("Devbox {} is {}", devbox.id, devbox.status.as_str());
        }
    }

    /// Start `command` without waiting for it to finish.
    pub async fn execute_async(&self, devbox_id: &str, command: &str) -> Result<ExecutionView> {
        self.send(
            LaunchStep::ExecuteAsync,
            self.http
                .post(self.url(&format!("/v1/devboxes/{}/execute_async", devbox_id)))
                .json(&ExecuteAsyncRequest { command }),
        )
        .await
    }

    pub async fn create_tunnel(&self, devbox_id: &str, port: u16) -> Result<TunnelView> {
        self.send(
            LaunchStep::CreateTunnel,
            self.http
                .post(self.url(&format!("/v1/devboxes/{}/create_tunnel", devbox_id)))
                .json(&CreateTunnelRequest { port }),
        )
        .await
    }

    pub async fn shutdown_devbox(&self, devbox_id: &str) -> Result<()> {
        self.send::<Value>(
            LaunchStep::Shutdown,
            self.http
                .post(self.url(&format!("/v1/devboxes/{}/shutdown", devbox_id))),
        )
        .await
        .map(|_| ())
    }
}

/// Build an `Api` error from a failed response body. The message is the
/// service's own when it sent one, then the raw body, then the status.
fn api_error(step: LaunchStep, status: u16, text: &str) -> LaunchError {
    let body = serde_json::from_str::<Value>(text).ok();
    let message = body
        .as_ref()
        .and_then(json_message)
        .or_else(|| body.as_ref().map(Value::to_string))
        .or_else(|| Some(text.trim().to_string()))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("{} status code (no body)", status));

    LaunchError::Api {
        step,
        status,
        message,
        body: body.or_else(|| (!text.is_empty()).then(|| Value::String(text.to_string()))),
    }
}

// `{"message": ..}`, `{"error": ..}` or `{"error": {"message": ..}}`.
fn json_message(value: &Value) -> Option<String> {
    let error = value.get("error");
    value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
