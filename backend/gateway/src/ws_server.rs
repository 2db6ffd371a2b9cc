//! WebSocket entrypoint and per-connection session driver.
//!
//! Each connection walks an explicit phase machine:
//! Connecting (optional resume handshake) -> Open (snapshot, replay, live
//! forwarding) -> Closing -> Closed. A failure anywhere affects only this
//! session; the hub and other viewers keep running.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use agentpulse_core::PulseError;

use crate::delivery::{Delivery, DeliveryCursor, LagOutcome};
use crate::server::GatewayState;
use crate::session::{SessionHandle, SessionPhase};
use crate::ws_protocol::{ClientMessage, CommandAction, ResumeFrame, ServerMessage};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Outcome of the connect-time handshake window.
#[derive(Debug)]
enum Handshake {
    /// Handshake frame received, or the window elapsed silently.
    Resume(Option<u64>),
    /// The client skipped the handshake and sent a command right away.
    EarlyCommand(ClientMessage),
    /// The client disconnected before completing the handshake.
    Gone,
}

/// Why the live loop ended; logged on the Closing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientClosed,
    ServerClosed,
    Overloaded,
    TransportError,
    HubClosed,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client closed"),
            CloseReason::ServerClosed => write!(f, "server closed"),
            CloseReason::Overloaded => write!(f, "session overloaded"),
            CloseReason::TransportError => write!(f, "transport error"),
            CloseReason::HubClosed => write!(f, "hub closed"),
        }
    }
}

async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let session_id = Uuid::new_v4();
    info!(%session_id, phase = %SessionPhase::Connecting, "Viewer connection accepted");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before replay so nothing published in between is lost; the
    // overlap is deduplicated against the delivery cursor below.
    let live = state.hub.subscribe();

    let handshake = match read_handshake(&mut receiver, state.settings.handshake_timeout).await {
        Ok(handshake) => handshake,
        Err(err) => {
            warn!(%session_id, error = %err, phase = %SessionPhase::Closed, "Handshake failed");
            let frame = ServerMessage::error("handshake_failed", err.to_string());
            let _ = send_frame(&mut sender, &frame).await;
            return;
        }
    };

    let (cursor, early_command) = match handshake {
        Handshake::Resume(cursor) => (cursor, None),
        Handshake::EarlyCommand(msg) => (None, Some(msg)),
        Handshake::Gone => {
            debug!(%session_id, phase = %SessionPhase::Closed, "Viewer left during handshake");
            return;
        }
    };

    let handle = SessionHandle::new(session_id);
    let close = handle.close_signal();
    state.sessions.register(handle).await;

    match open_session(&mut sender, &state, cursor).await {
        Ok(delivery) => {
            info!(%session_id, phase = %SessionPhase::Open, resume = ?cursor, "Viewer session open");

            let mut reason = None;
            if let Some(msg) = early_command {
                if dispatch_command(msg, &state, &mut sender, &session_id)
                    .await
                    .is_err()
                {
                    reason = Some(CloseReason::TransportError);
                }
            }

            let reason = match reason {
                Some(reason) => reason,
                None => {
                    live_loop(
                        &mut sender,
                        &mut receiver,
                        live,
                        &close,
                        &state,
                        session_id,
                        delivery,
                    )
                    .await
                }
            };
            info!(%session_id, phase = %SessionPhase::Closing, %reason, "Viewer session closing");
        }
        Err(_) => {
            // Snapshot or replay never reached the viewer; nothing to drain.
            warn!(%session_id, phase = %SessionPhase::Closing, "Viewer lost during replay");
        }
    }

    state.sessions.unregister(&session_id).await;
    info!(%session_id, phase = %SessionPhase::Closed, "Viewer session closed");
}

/// Wait up to `window` for the optional `{"resumeFrom": n}` first frame.
/// Keepalive frames do not consume the handshake slot.
async fn read_handshake(
    receiver: &mut SplitStream<WebSocket>,
    window: Duration,
) -> Result<Handshake, PulseError> {
    let deadline = Instant::now() + window;
    loop {
        let frame = match timeout_at(deadline, receiver.next()).await {
            // Silence within the window means "no resume cursor".
            Err(_) => return Ok(Handshake::Resume(None)),
            Ok(None) | Ok(Some(Err(_))) => return Ok(Handshake::Gone),
            Ok(Some(Ok(frame))) => frame,
        };
        match parse_handshake_frame(&frame)? {
            Some(handshake) => return Ok(handshake),
            // Keepalive; the handshake frame may still follow
            None => continue,
        }
    }
}

/// Interpret a frame received during the handshake window.
/// `Ok(None)` is a ping/pong keepalive that settles nothing.
fn parse_handshake_frame(frame: &Message) -> Result<Option<Handshake>, PulseError> {
    match frame {
        Message::Text(text) => {
            if let Ok(resume) = serde_json::from_str::<ResumeFrame>(text) {
                Ok(Some(Handshake::Resume(resume.resume_from)))
            } else if let Ok(msg) = serde_json::from_str::<ClientMessage>(text) {
                Ok(Some(Handshake::EarlyCommand(msg)))
            } else {
                Err(PulseError::HandshakeFailed(
                    "first frame is neither a resume handshake nor a command".to_string(),
                ))
            }
        }
        Message::Close(_) => Ok(Some(Handshake::Gone)),
        Message::Binary(_) => Err(PulseError::HandshakeFailed(
            "binary frame during connect".to_string(),
        )),
        Message::Ping(_) | Message::Pong(_) => Ok(None),
    }
}

/// Send the registry snapshot and buffered history, returning the delivery
/// cursor positioned at the highest seq the viewer now has.
async fn open_session(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &GatewayState,
    cursor: Option<u64>,
) -> Result<DeliveryCursor, axum::Error> {
    let agents = state.registry.list().await;
    send_frame(sender, &ServerMessage::Snapshot { agents }).await?;

    // Clamp before replay: a cursor past the newest assigned seq (a stale
    // viewer reconnecting after a counter reset) resumes from the live head
    // instead of skipping events until the counter catches up.
    let start = DeliveryCursor::resume_point(cursor, state.hub.latest_seq().await);
    let mut delivery = DeliveryCursor::new(start, state.settings.lag_disconnect_threshold);

    let replay = state.hub.replay_since(cursor.map(|_| start)).await;
    if let Some(gap) = replay.gap {
        send_frame(sender, &ServerMessage::gap(gap)).await?;
    }
    for event in &replay.events {
        send_frame(sender, &ServerMessage::event(event)).await?;
        delivery.advance(event.seq);
    }
    Ok(delivery)
}

/// Forward live events until the session ends, turning queue overflows into
/// explicit gap frames and repeated overflows into a forced disconnect.
async fn live_loop(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    mut live: tokio::sync::broadcast::Receiver<agentpulse_core::Event>,
    close: &tokio::sync::Notify,
    state: &GatewayState,
    session_id: Uuid,
    mut delivery: DeliveryCursor,
) -> CloseReason {
    loop {
        tokio::select! {
            _ = close.notified() => return CloseReason::ServerClosed,

            received = live.recv() => match received {
                Ok(event) => match delivery.on_event(event.seq) {
                    // Already delivered during replay
                    Delivery::Skip => {}
                    Delivery::Forward { gap } => {
                        if let Some(gap) = gap {
                            if send_frame(sender, &ServerMessage::gap(gap)).await.is_err() {
                                return CloseReason::TransportError;
                            }
                        }
                        if send_frame(sender, &ServerMessage::event(&event)).await.is_err() {
                            return CloseReason::TransportError;
                        }
                    }
                },
                Err(RecvError::Lagged(missed)) => {
                    let outcome = delivery.on_overflow();
                    warn!(
                        %session_id,
                        missed,
                        strikes = delivery.lag_strikes(),
                        "Viewer queue overflowed; oldest undelivered events dropped"
                    );
                    if outcome == LagOutcome::Disconnect {
                        let err = PulseError::SessionOverloaded(session_id);
                        let frame = ServerMessage::error("session_overloaded", err.to_string());
                        let _ = send_frame(sender, &frame).await;
                        return CloseReason::Overloaded;
                    }
                    // The viewer resyncs from the gap frame owed on the next
                    // delivered event
                }
                Err(RecvError::Closed) => return CloseReason::HubClosed,
            },

            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if handle_client_frame(&text, state, sender, &session_id).await.is_err() {
                        return CloseReason::TransportError;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return CloseReason::ClientClosed,
                Some(Ok(_)) => {} // ping/pong/binary ignored mid-session
                Some(Err(_)) => return CloseReason::TransportError,
            },
        }
    }
}

async fn handle_client_frame(
    text: &str,
    state: &GatewayState,
    sender: &mut SplitSink<WebSocket, Message>,
    session_id: &Uuid,
) -> Result<(), axum::Error> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => dispatch_command(msg, state, sender, session_id).await,
        Err(_) => {
            warn!(%session_id, "Unparseable client frame");
            let frame = ServerMessage::error("bad_frame", "expected a command frame");
            send_frame(sender, &frame).await
        }
    }
}

async fn dispatch_command(
    msg: ClientMessage,
    state: &GatewayState,
    sender: &mut SplitSink<WebSocket, Message>,
    session_id: &Uuid,
) -> Result<(), axum::Error> {
    let ClientMessage::Command { action, agent_id } = msg;
    debug!(%session_id, ?action, %agent_id, "Viewer command");

    let result = match action {
        CommandAction::Activate => state.control.activate(&agent_id).await,
        CommandAction::Deactivate => state.control.deactivate(&agent_id).await,
    };

    match result {
        // Any lifecycle event reaches the viewer through the hub like every
        // other event; nothing to send inline.
        Ok(_) => Ok(()),
        Err(err @ PulseError::UnknownAgent(_)) => {
            let frame = ServerMessage::error("unknown_agent", err.to_string());
            send_frame(sender, &frame).await
        }
        Err(err) => {
            error!(%session_id, error = %err, "Command failed");
            let frame = ServerMessage::error("command_failed", err.to_string());
            send_frame(sender, &frame).await
        }
    }
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(frame: &str) -> Message {
        Message::Text(frame.to_string())
    }

    #[test]
    fn test_resume_frame_settles_handshake() {
        let parsed = parse_handshake_frame(&text(r#"{"resumeFrom":12}"#)).unwrap();
        assert!(matches!(parsed, Some(Handshake::Resume(Some(12)))));
    }

    #[test]
    fn test_empty_handshake_means_no_cursor() {
        let parsed = parse_handshake_frame(&text("{}")).unwrap();
        assert!(matches!(parsed, Some(Handshake::Resume(None))));
    }

    #[test]
    fn test_command_first_frame_is_deferred() {
        let parsed = parse_handshake_frame(&text(
            r#"{"type":"command","action":"activate","agentId":"a1"}"#,
        ))
        .unwrap();
        assert!(matches!(
            parsed,
            Some(Handshake::EarlyCommand(ClientMessage::Command {
                action: CommandAction::Activate,
                ..
            }))
        ));
    }

    #[test]
    fn test_malformed_first_frame_fails_handshake() {
        let err = parse_handshake_frame(&text("let me in")).unwrap_err();
        assert!(matches!(err, PulseError::HandshakeFailed(_)));
    }

    #[test]
    fn test_malformed_cursor_fails_handshake() {
        let err = parse_handshake_frame(&text(r#"{"resumeFrom":"soon"}"#)).unwrap_err();
        assert!(matches!(err, PulseError::HandshakeFailed(_)));
    }

    #[test]
    fn test_binary_frame_fails_handshake() {
        let err = parse_handshake_frame(&Message::Binary(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, PulseError::HandshakeFailed(_)));
    }

    #[test]
    fn test_keepalive_does_not_consume_handshake() {
        assert!(parse_handshake_frame(&Message::Ping(Vec::new()))
            .unwrap()
            .is_none());
        assert!(parse_handshake_frame(&Message::Pong(Vec::new()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_close_during_handshake_is_gone() {
        let parsed = parse_handshake_frame(&Message::Close(None)).unwrap();
        assert!(matches!(parsed, Some(Handshake::Gone)));
    }
}
