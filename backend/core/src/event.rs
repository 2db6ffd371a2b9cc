use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent id carried by lifecycle and other service-originated events.
pub const SYSTEM_AGENT: &str = "system";

/// An immutable, globally sequenced record of something an agent (or the
/// service itself) reported. Sequence numbers are assigned at ingestion,
/// are strictly increasing process-wide, and are never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: String,
}

impl Event {
    pub fn new(seq: u64, agent_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            seq,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            payload: payload.into(),
        }
    }

    /// Whether this event was emitted by the service rather than an agent.
    pub fn is_system(&self) -> bool {
        self.agent_id == SYSTEM_AGENT
    }
}

/// An inclusive range of sequence numbers that were not delivered, either
/// because the buffer evicted them or because a session's queue overflowed.
/// Informational, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gap {
    pub from: u64,
    pub to: u64,
}

impl Gap {
    pub fn new(from: u64, to: u64) -> Self {
        debug_assert!(from <= to);
        Self { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(7, "mailer", "fetched 12 messages");
        assert_eq!(event.seq, 7);
        assert_eq!(event.agent_id, "mailer");
        assert!(!event.is_system());
    }

    #[test]
    fn test_system_event() {
        let event = Event::new(1, SYSTEM_AGENT, "agent mailer activated");
        assert!(event.is_system());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(42, "indexer", "reindex complete");
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
