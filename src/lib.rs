//! Launch a Runloop devbox with an agent mount, start the agent's server,
//! tunnel to it, and hand back a chat UI link.

pub mod config;
pub mod error;
pub mod http_server;
pub mod launcher;
pub mod orchestrator;
pub mod runloop;
pub mod state;
pub mod types;

pub use config::{AgentSource, LaunchConfig};
pub use error::{LaunchError, LaunchStep};
pub use state::AppState;
pub use types::{ErrorCode, ErrorPayload, LaunchRequest, LaunchResult};
