//! Client for the launch endpoint, for scripts and the `launch` subcommand.

use crate::http_server::LAUNCH_DEVBOX_PATH;
use crate::types::{ErrorPayload, LaunchRequest, LaunchResult};
use thiserror::Error;
use tracing::info;

const FALLBACK_FAILURE_MESSAGE: &str = "Failed to launch devbox";

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("invalid server URL: {0}")]
    InvalidServerUrl(#[from] url::ParseError),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with an error payload (or something unreadable).
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        payload: Option<ErrorPayload>,
    },

    #[error("failed to open {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct LaunchClient {
    http: reqwest::Client,
    endpoint: url::Url,
}

impl LaunchClient {
    /// `server_url` is the base address of a running `devbox-launcher serve`;
    /// a path prefix such as `/app` is kept.
    pub fn new(server_url: &str) -> Result<Self, LauncherError> {
        let mut base = url::Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(LAUNCH_DEVBOX_PATH.trim_start_matches('/'))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Launch and return the full result.
    pub async fn launch_devbox_with_response(
        &self,
        request: &LaunchRequest,
    ) -> Result<LaunchResult, LauncherError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.json::<ErrorPayload>().await.ok();
            let message = payload
                .as_ref()
                .map(|p| p.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string());
            return Err(LauncherError::Rejected {
                status: status.as_u16(),
                message,
                payload,
            });
        }

        Ok(response.json::<LaunchResult>().await?)
    }

    /// Launch and return only the chat URL.
    pub async fn launch_devbox(&self, request: &LaunchRequest) -> Result<String, LauncherError> {
        Ok(self.launch_devbox_with_response(request).await?.chat_url)
    }

    /// Launch, open the chat URL in the system browser, and return it.
    pub async fn launch_devbox_and_open(
        &self,
        request: &LaunchRequest,
    ) -> Result<String, LauncherError> {
        let chat_url = self.launch_devbox(request).await?;
        info!("Opening {}", chat_url);
        open::that(&chat_url).map_err(|source| LauncherError::Open {
            url: chat_url.clone(),
            source,
        })?;
        Ok(chat_url)
    }
}
