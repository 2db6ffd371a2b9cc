use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use agentpulse_core::{AgentRegistry, Event, PulseError};
use agentpulse_hub::{BroadcastHub, ControlInterface};

use crate::session::SessionRegistry;
use crate::ws_server;

/// Shared application state for all routes and the WebSocket handler.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<AgentRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub control: Arc<ControlInterface>,
    pub sessions: SessionRegistry,
    pub settings: SessionSettings,
    pub started_at: DateTime<Utc>,
}

/// Per-connection tuning knobs, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// How long to wait for the optional resume handshake frame.
    pub handshake_timeout: Duration,
    /// Queue overflows tolerated before a session is forcibly closed.
    pub lag_disconnect_threshold: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(500),
            lag_disconnect_threshold: 8,
        }
    }
}

impl GatewayState {
    pub fn new(
        registry: Arc<AgentRegistry>,
        hub: Arc<BroadcastHub>,
        settings: SessionSettings,
    ) -> Self {
        let control = Arc::new(ControlInterface::new(registry.clone(), hub.clone()));
        Self {
            registry,
            hub,
            control,
            sessions: SessionRegistry::new(),
            settings,
            started_at: Utc::now(),
        }
    }
}

/// Build the Axum router with all API routes and the viewer WebSocket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id/activate", post(activate_agent))
        .route("/api/agents/:id/deactivate", post(deactivate_agent))
        .route("/api/events", post(ingest_event))
        .route("/api/status", get(get_status))
        .route("/ws", get(ws_server::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the listener fails or the process is stopped.
/// Ctrl-C closes every viewer session before the server exits.
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let sessions = state.sessions.clone();
    let app = build_router(state);

    info!("Gateway listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received; closing viewer sessions");
            sessions.close_all().await;
        })
        .await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "agentpulse",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Registry snapshot, stable-ordered by agent id.
async fn list_agents(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({ "agents": state.registry.list().await }))
}

async fn activate_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    transition_response(state.control.activate(&id).await)
}

async fn deactivate_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    transition_response(state.control.deactivate(&id).await)
}

fn transition_response(
    result: Result<Option<Event>, PulseError>,
) -> Result<Json<Value>, StatusCode> {
    match result {
        Ok(Some(event)) => Ok(Json(json!({ "status": "changed", "seq": event.seq }))),
        Ok(None) => Ok(Json(json!({ "status": "unchanged" }))),
        Err(PulseError::UnknownAgent(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(error = %e, "Agent transition failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Producer ingestion: one agent-tagged log/status line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    agent_id: String,
    payload: String,
}

async fn ingest_event(
    State(state): State<GatewayState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<Value>, StatusCode> {
    // Events must be tagged with a registered agent; lifecycle events are
    // published by the control interface, never through this boundary.
    if state.registry.get(&request.agent_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    match state.hub.publish(request.agent_id, request.payload).await {
        Ok(event) => Ok(Json(json!({ "status": "published", "seq": event.seq }))),
        Err(PulseError::PayloadTooLarge { .. }) => Err(StatusCode::PAYLOAD_TOO_LARGE),
        Err(e) => {
            error!(error = %e, "Event ingestion failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Uptime, session count, and buffer stats for the operator surface.
async fn get_status(State(state): State<GatewayState>) -> Json<Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(json!({
        "uptime_seconds": uptime,
        "agents": state.registry.len().await,
        "sessions": state.sessions.count().await,
        "hub": state.hub.stats().await,
    }))
}
