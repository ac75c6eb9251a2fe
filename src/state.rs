//! Shared application state.

use crate::config::LaunchConfig;
use crate::error::Result;
use crate::runloop::RunloopClient;
use std::sync::Arc;

/// Immutable configuration plus a pooled HTTP client, cloned into every
/// handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LaunchConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// A missing API key surfaces here, per request, not at startup.
    pub fn runloop_client(&self) -> Result<RunloopClient> {
        RunloopClient::new(
            self.http.clone(),
            &self.config.runloop_base_url,
            self.config.api_key.as_ref(),
        )
    }
}
