//! Process-wide launch configuration and per-request default resolution.

use crate::error::{LaunchError, Result};
use crate::types::{DevboxConfig, LaunchRequest};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_RUNLOOP_BASE_URL: &str = "https://api.runloop.pro";
pub const DEFAULT_CHAT_BASE_URL: &str = "https://agentchat.vercel.app";
pub const FALLBACK_COMMAND: &str = "CONFIGURABLE_AGENT_LAUNCH_COMMAND";
pub const FALLBACK_PORT: u16 = 2024;
pub const FALLBACK_ASSISTANT_ID: &str = "agent";
pub const DEFAULT_AGENT_PATH: &str = "/home/user/agent";

/// Where the mounted agent's id may come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentSource {
    /// Request value or configured default; shared secrets are attached.
    #[default]
    Default,
    /// Caller must name the agent; no shared secrets are attached.
    Caller,
}

/// Everything a launch needs besides the request body.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub api_key: Option<SecretString>,
    pub runloop_base_url: String,
    pub agent_source: AgentSource,
    pub default_agent_id: Option<String>,
    pub default_command: Option<String>,
    pub default_port: Option<u16>,
    pub default_assistant_id: Option<String>,
    pub chat_base_url: String,
    pub agent_path: String,
    pub secrets: BTreeMap<String, String>,
    pub shutdown_on_failure: bool,
    pub await_running_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            runloop_base_url: DEFAULT_RUNLOOP_BASE_URL.to_string(),
            agent_source: AgentSource::Default,
            default_agent_id: None,
            default_command: None,
            default_port: None,
            default_assistant_id: None,
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            agent_path: DEFAULT_AGENT_PATH.to_string(),
            secrets: default_secrets(),
            shutdown_on_failure: false,
            await_running_timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// The agent needs its model key inside the devbox.
pub fn default_secrets() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "ANTHROPIC_API_KEY".to_string(),
        "ANTHROPIC_API_KEY".to_string(),
    )])
}

/// Parse `NAME=SECRET` pairs; a bare `NAME` maps to a secret of the same name.
pub fn parse_secrets<S: AsRef<str>>(entries: &[S]) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut secrets = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        let (name, secret) = match entry.split_once('=') {
            Some((name, secret)) => (name.trim(), secret.trim()),
            None => (entry, entry),
        };
        if name.is_empty() || secret.is_empty() {
            return Err(format!("invalid secret mapping: {}", entry));
        }
        secrets.insert(name.to_string(), secret.to_string());
    }
    Ok(secrets)
}

// Falsy request values count as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl LaunchConfig {
    /// Resolve request fields against configured defaults. Fails with
    /// `MissingAgentId` before anything touches the network.
    pub fn resolve(&self, req: &LaunchRequest) -> Result<DevboxConfig> {
        let configured_agent = match self.agent_source {
            AgentSource::Default => present(&self.default_agent_id),
            AgentSource::Caller => None,
        };
        let agent_id = present(&req.agent_id)
            .or(configured_agent)
            .ok_or(LaunchError::MissingAgentId)?
            .to_string();

        let command = present(&req.command)
            .or(present(&self.default_command))
            .unwrap_or(FALLBACK_COMMAND)
            .to_string();

        let port = req
            .port
            .filter(|p| *p != 0)
            .or(self.default_port.filter(|p| *p != 0))
            .unwrap_or(FALLBACK_PORT);

        let assistant_id = present(&req.assistant_id)
            .or(present(&self.default_assistant_id))
            .unwrap_or(FALLBACK_ASSISTANT_ID)
            .to_string();

        let secrets = match self.agent_source {
            AgentSource::Default => self.secrets.clone(),
            AgentSource::Caller => BTreeMap::new(),
        };

        Ok(DevboxConfig {
            agent_id,
            command,
            port,
            assistant_id,
            secrets,
        })
    }
}
