//! HTTP server implementation using Axum.

use crate::error::LaunchError;
use crate::orchestrator;
use crate::state::AppState;
use crate::types::{LaunchRequest, LaunchResult};
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};

pub const LAUNCH_DEVBOX_PATH: &str = "/api/runloop/launch-devbox";

/// Routes and middleware, without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(LAUNCH_DEVBOX_PATH, post(launch_devbox))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server on the given port with the provided state.
pub async fn run_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> &'static str {
    "OK"
}

async fn launch_devbox(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LaunchResult>, LaunchError> {
    let launch_id = uuid::Uuid::new_v4();
    let span = info_span!("launch_devbox", %launch_id);

    async move {
        // Parsed regardless of Content-Type.
        let req: LaunchRequest = serde_json::from_slice(&body)
            .map_err(|e| LaunchError::InvalidBody(format!("Invalid JSON request body: {}", e)))?;
        info!("POST {} - request: {:?}", LAUNCH_DEVBOX_PATH, req);

        let devbox = state.config.resolve(&req)?;
        let client = state.runloop_client()?;
        let result = orchestrator::launch_devbox(&client, &state.config, &devbox).await?;

        info!("POST {} - devbox {} ready at {}", LAUNCH_DEVBOX_PATH, result.devbox_id, result.chat_url);
        Ok::<_, LaunchError>(Json(result))
    }
    .instrument(span)
    .await
}
