//! Event stream trace log.
//!
//! Every event that passes through the hub can be recorded as one NDJSON line
//! under the `pulse_events` tracing target, giving operators a session-scoped
//! trail without any persistence machinery.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use agentpulse_core::Event;

#[derive(Debug, Serialize)]
pub struct StreamLogEntry<'a> {
    pub seq: u64,
    pub agent_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub payload: &'a str,
}

impl<'a> StreamLogEntry<'a> {
    pub fn from_event(event: &'a Event) -> Self {
        Self {
            seq: event.seq,
            agent_id: &event.agent_id,
            timestamp: event.timestamp,
            payload: &event.payload,
        }
    }

    /// Render the entry as one NDJSON line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub struct StreamEventLogger;

impl StreamEventLogger {
    /// Trace one published event as a JSON line.
    pub fn record(event: &Event) {
        let entry = StreamLogEntry::from_event(event);
        match entry.to_line() {
            Ok(line) => info!(target: "pulse_events", entry = %line, "Stream event"),
            Err(err) => {
                warn!(target: "pulse_events", error = %err, seq = event.seq, "Unloggable event")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_flat() {
        let event = Event::new(3, "mailer", "inbox drained");
        let json = serde_json::to_value(StreamLogEntry::from_event(&event)).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["agent_id"], "mailer");
    }

    #[test]
    fn test_entry_renders_as_json_line() {
        let event = Event::new(7, "mailer", "sent 4 messages");
        let line = StreamLogEntry::from_event(&event).to_line().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["seq"], 7);
        assert_eq!(parsed["payload"], "sent 4 messages");
        assert!(!line.contains('\n'));
    }
}
