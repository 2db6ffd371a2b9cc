//! Wire protocol for the viewer WebSocket.
//!
//! All frames are JSON. Server frames carry a lowercase `type` tag; client
//! frames are either the optional resume handshake (first frame only) or a
//! `command` frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentpulse_core::{Agent, Event, Gap};

/// Frames sent server -> client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Registry state at connect time; always the first frame of a session.
    Snapshot { agents: Vec<Agent> },
    /// One live or replayed event.
    #[serde(rename_all = "camelCase")]
    Event {
        seq: u64,
        agent_id: String,
        timestamp: DateTime<Utc>,
        payload: String,
    },
    /// Events in `fromSeq..=toSeq` were dropped (eviction or backpressure).
    #[serde(rename_all = "camelCase")]
    Gap { from_seq: u64, to_seq: u64 },
    /// A command failure or session termination cause.
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn event(event: &Event) -> Self {
        ServerMessage::Event {
            seq: event.seq,
            agent_id: event.agent_id.clone(),
            timestamp: event.timestamp,
            payload: event.payload.clone(),
        }
    }

    pub fn gap(gap: Gap) -> Self {
        ServerMessage::Gap {
            from_seq: gap.from,
            to_seq: gap.to,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Frames sent client -> server after the handshake window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Command {
        action: CommandAction,
        agent_id: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Activate,
    Deactivate,
}

/// Optional first frame: `{"resumeFrom": <last seen seq>}`. Unknown fields
/// are rejected so a command frame is never mistaken for a handshake.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResumeFrame {
    #[serde(rename = "resumeFrom", default)]
    pub resume_from: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentpulse_core::AgentState;

    #[test]
    fn test_snapshot_wire_shape() {
        let frame = ServerMessage::Snapshot {
            agents: vec![Agent {
                id: "a1".into(),
                name: "Mailer".into(),
                state: AgentState::Active,
            }],
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["agents"][0]["id"], "a1");
        assert_eq!(json["agents"][0]["state"], "active");
    }

    #[test]
    fn test_event_wire_shape_is_camel_case() {
        let frame = ServerMessage::event(&Event::new(9, "mailer", "sent 3"));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["seq"], 9);
        assert_eq!(json["agentId"], "mailer");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_gap_wire_shape() {
        let frame = ServerMessage::gap(Gap::new(4, 7));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "gap");
        assert_eq!(json["fromSeq"], 4);
        assert_eq!(json["toSeq"], 7);
    }

    #[test]
    fn test_command_frame_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"command","action":"activate","agentId":"a1"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Command {
                action: CommandAction::Activate,
                agent_id: "a1".into(),
            }
        );
    }

    #[test]
    fn test_resume_frame_parses() {
        let frame: ResumeFrame = serde_json::from_str(r#"{"resumeFrom":41}"#).unwrap();
        assert_eq!(frame.resume_from, Some(41));

        let empty: ResumeFrame = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.resume_from, None);
    }

    #[test]
    fn test_resume_frame_rejects_command_shape() {
        let parsed = serde_json::from_str::<ResumeFrame>(
            r#"{"type":"command","action":"activate","agentId":"a1"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_malformed_cursor_rejected() {
        assert!(serde_json::from_str::<ResumeFrame>(r#"{"resumeFrom":"soon"}"#).is_err());
    }
}
