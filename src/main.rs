//! devbox-launcher - launch Runloop devboxes for agent chat.
//!
//! Usage:
//!   devbox-launcher serve [--port 8080]                 # Start HTTP server
//!   devbox-launcher launch --agent-id <id> [--open]     # Call a running server

use clap::{Args as ClapArgs, Parser, Subcommand};
use devbox_launcher::config::{
    self, AgentSource, LaunchConfig, DEFAULT_AGENT_PATH, DEFAULT_CHAT_BASE_URL,
    DEFAULT_RUNLOOP_BASE_URL,
};
use devbox_launcher::launcher::LaunchClient;
use devbox_launcher::{http_server, AppState, LaunchRequest};
use secrecy::SecretString;
use std::process::exit;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "devbox-launcher")]
#[command(about = "Launch Runloop devboxes with an agent mount and get a chat URL")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Ask a running server to launch a devbox
    Launch(LaunchArgs),
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Runloop API key
    #[arg(long, env = "RUNLOOP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Runloop API base URL
    #[arg(long, env = "RUNLOOP_BASE_URL", default_value = DEFAULT_RUNLOOP_BASE_URL)]
    runloop_base_url: String,

    /// Whether the agent id may come from configuration or only from callers
    #[arg(long, env = "RUNLOOP_AGENT_SOURCE", value_enum, default_value_t = AgentSource::Default)]
    agent_source: AgentSource,

    /// Agent mounted when the request names none
    #[arg(long, env = "RUNLOOP_DEFAULT_AGENT_ID")]
    default_agent_id: Option<String>,

    /// Command started in the devbox when the request names none
    #[arg(long, env = "RUNLOOP_DEFAULT_COMMAND")]
    default_command: Option<String>,

    /// Port tunneled when the request names none
    #[arg(long, env = "RUNLOOP_DEFAULT_PORT")]
    default_port: Option<u16>,

    /// Assistant id passed to the chat UI when the request names none
    #[arg(long, env = "RUNLOOP_DEFAULT_ASSISTANT_ID")]
    default_assistant_id: Option<String>,

    /// Chat UI base URL
    #[arg(long, env = "AGENT_CHAT_BASE_URL", default_value = DEFAULT_CHAT_BASE_URL)]
    chat_base_url: String,

    /// Where the agent is mounted inside the devbox
    #[arg(long, env = "RUNLOOP_AGENT_PATH", default_value = DEFAULT_AGENT_PATH)]
    agent_path: String,

    /// Secrets exposed to the devbox, as ENV_NAME=SECRET_NAME
    #[arg(long = "secret", env = "RUNLOOP_DEVBOX_SECRETS", value_delimiter = ',')]
    secrets: Vec<String>,

    /// Shut the devbox down when a step after provisioning fails
    #[arg(long, env = "RUNLOOP_SHUTDOWN_ON_FAILURE")]
    shutdown_on_failure: bool,

    /// How long to wait for a new devbox to reach running, in seconds
    #[arg(long, env = "RUNLOOP_AWAIT_RUNNING_SECS", default_value = "600")]
    await_running_secs: u64,

    /// Devbox status poll interval in milliseconds
    #[arg(long, env = "RUNLOOP_POLL_INTERVAL_MS", default_value = "1000")]
    poll_interval_ms: u64,
}

impl ServeArgs {
    fn into_config(self) -> Result<LaunchConfig, String> {
        url::Url::parse(&self.runloop_base_url)
            .map_err(|e| format!("invalid RUNLOOP_BASE_URL {}: {}", self.runloop_base_url, e))?;
        url::Url::parse(&self.chat_base_url)
            .map_err(|e| format!("invalid AGENT_CHAT_BASE_URL {}: {}", self.chat_base_url, e))?;

        let secrets = if self.secrets.is_empty() {
            config::default_secrets()
        } else {
            config::parse_secrets(&self.secrets)?
        };

        Ok(LaunchConfig {
            api_key: self.api_key.map(SecretString::from),
            runloop_base_url: self.runloop_base_url,
            agent_source: self.agent_source,
            default_agent_id: self.default_agent_id,
            default_command: self.default_command,
            default_port: self.default_port,
            default_assistant_id: self.default_assistant_id,
            chat_base_url: self.chat_base_url,
            agent_path: self.agent_path,
            secrets,
            shutdown_on_failure: self.shutdown_on_failure,
            await_running_timeout: Duration::from_secs(self.await_running_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

#[derive(ClapArgs, Debug)]
struct LaunchArgs {
    /// Base URL of a running devbox-launcher server
    #[arg(long, env = "DEVBOX_LAUNCHER_URL", default_value = "http://localhost:8080")]
    server: String,

    #[arg(long)]
    agent_id: Option<String>,

    #[arg(long)]
    command: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    assistant_id: Option<String>,

    /// Open the chat URL in the browser
    #[arg(long, conflicts_with = "full")]
    open: bool,

    /// Print the full launch result as JSON
    #[arg(long)]
    full: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve(serve) => {
            let port = serve.port;
            let config = match serve.into_config() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit(1);
                }
            };
            if config.api_key.is_none() {
                warn!("RUNLOOP_API_KEY is not set; launches will fail until it is");
            }

            if let Err(e) = http_server::run_server(port, AppState::new(config)).await {
                eprintln!("Error: {}", e);
                exit(1);
            }
        }
        Commands::Launch(launch) => {
            if let Err(e) = run_launch(launch).await {
                eprintln!("Error: {}", e);
                exit(1);
            }
        }
    }
}

async fn run_launch(args: LaunchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = LaunchClient::new(&args.server)?;
    let request = LaunchRequest {
        agent_id: args.agent_id,
        command: args.command,
        port: args.port,
        assistant_id: args.assistant_id,
    };

    if args.full {
        let result = client.launch_devbox_with_response(&request).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.open {
        println!("{}", client.launch_devbox_and_open(&request).await?);
    } else {
        println!("{}", client.launch_devbox(&request).await?);
    }
    Ok(())
}
