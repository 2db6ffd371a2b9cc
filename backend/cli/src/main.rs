use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use agentpulse_config::{apply_env_overrides, config_dir, config_file_path, load_config, validate};
use agentpulse_config::PulseConfig;
use agentpulse_core::AgentRegistry;
use agentpulse_gateway::{start_server, GatewayState, SessionSettings};
use agentpulse_hub::BroadcastHub;
use logging::{init_logger, StreamEventLogger};

#[derive(Parser)]
#[command(name = "agentpulse")]
#[command(about = "AgentPulse — real-time agent activity streaming")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: ~/.agentpulse/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the streaming service
    Serve {
        /// Port to bind the gateway to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show a running service's status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let mut config = load_config(&path).await?;
    apply_env_overrides(&mut config);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Status => status(config).await,
    }
}

async fn serve(config: PulseConfig) -> Result<()> {
    init_logger(Some(Path::new(&config.logging.dir)), &config.logging.level);

    let report = validate(&config);
    for warning in &report.warnings {
        warn!(warning = %warning, "Config warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!(error = %err, "Config error");
        }
        bail!("invalid configuration ({} errors)", report.errors.len());
    }

    info!(
        port = config.server.port,
        bind = %config.server.bind_address,
        buffer_capacity = config.buffer.capacity,
        "Starting AgentPulse"
    );

    let registry = Arc::new(AgentRegistry::new());
    for agent in &config.agents {
        registry.register(&agent.id, &agent.name).await?;
    }
    info!(agents = config.agents.len(), "Roster registered");

    let hub = Arc::new(BroadcastHub::new(
        config.buffer.capacity,
        config.buffer.max_payload_bytes,
        config.session.fanout_capacity,
    ));

    // Event trace log: every published event becomes one NDJSON line. The
    // trace subscriber is best-effort; a lag here loses trace lines only.
    let mut trace_rx = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match trace_rx.recv().await {
                Ok(event) => StreamEventLogger::record(&event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let settings = SessionSettings {
        handshake_timeout: Duration::from_millis(config.session.handshake_timeout_ms),
        lag_disconnect_threshold: config.session.lag_disconnect_threshold,
    };
    let state = GatewayState::new(registry, hub, settings);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("invalid bind address")?;
    start_server(addr, state).await
}

async fn status(config: PulseConfig) -> Result<()> {
    let client = reqwest::Client::new();
    match client
        .get(format!("http://localhost:{}/api/status", config.server.port))
        .send()
        .await
    {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!(
                "AgentPulse is not running on port {}",
                config.server.port
            );
        }
    }
    Ok(())
}
