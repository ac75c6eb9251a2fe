//! The launch sequence: devbox, command, tunnel, chat URL.

use crate::config::LaunchConfig;
use crate::error::{LaunchError, Result};
use crate::runloop::{CreateDevboxRequest, DevboxView, Mount, RunloopClient};
use crate::types::{DevboxConfig, LaunchResult};
use tracing::{info, warn};

/// Chat UI link that points the client at `tunnel_url`.
pub fn build_chat_url(base_url: &str, tunnel_url: &str, assistant_id: &str) -> String {
    format!(
        "{}/?apiUrl={}&assistantId={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(tunnel_url),
        urlencoding::encode(assistant_id),
    )
}

/// Run the three remote steps in order and assemble the result. Nothing is
/// retried; once the create call succeeds, any later failure (including the
/// wait for running) is wrapped in `AfterProvision`, and the devbox is only
/// shut down when `shutdown_on_failure` is set.
pub async fn launch_devbox(
    client: &RunloopClient,
    config: &LaunchConfig,
    devbox: &DevboxConfig,
) -> Result<LaunchResult> {
    let request = CreateDevboxRequest {
        mounts: vec![Mount::AgentMount {
            agent_id: devbox.agent_id.clone(),
            agent_name: None,
            agent_path: config.agent_path.clone(),
        }],
        secrets: devbox.secrets.clone(),
    };

    info!("Creating devbox with agent mount {}", devbox.agent_id);
    let created = client.create_devbox(&request).await?;
    let devbox_id = created.id.clone();
    info!("Created devbox {} ({})", devbox_id, created.status.as_str());

    match provision_and_expose(client, config, created, devbox).await {
        Ok(tunnel_url) => {
            let chat_url = build_chat_url(&config.chat_base_url, &tunnel_url, &devbox.assistant_id);
            Ok(LaunchResult {
                tunnel_url,
                devbox_id,
                chat_url,
            })
        }
        Err(err) => {
            let shut_down = config.shutdown_on_failure && shutdown(client, &devbox_id).await;
            Err(LaunchError::AfterProvision {
                devbox_id,
                shut_down,
                source: Box::new(err),
            })
        }
    }
}

// Everything after the create call; any failure here leaves a devbox behind.
async fn provision_and_expose(
    client: &RunloopClient,
    config: &LaunchConfig,
    created: DevboxView,
    devbox: &DevboxConfig,
) -> Result<String> {
    let running = client
        .await_running(created, config.poll_interval, config.await_running_timeout)
        .await?;
    let devbox_id = running.id.as_str();
    info!("Devbox {} is running", devbox_id);

    let execution = client.execute_async(devbox_id, &devbox.command).await?;
    info!(
        execution_id = ?execution.execution_id,
        "Started `{}` on devbox {}", devbox.command, devbox_id
    );

    let tunnel = client.create_tunnel(devbox_id, devbox.port).await?;
    info!("Tunnel to port {} on devbox {}: {}", devbox.port, devbox_id, tunnel.url);
    Ok(tunnel.url)
}

async fn shutdown(client: &RunloopClient, devbox_id: &str) -> bool {
    match client.shutdown_devbox(devbox_id).await {
        Ok(()) => {
            info!("Shut down devbox {} after failed launch", devbox_id);
            true
        }
        Err(e) => {
            warn!("Failed to shut down devbox {}: {}", devbox_id, e);
            false
        }
    }
}
