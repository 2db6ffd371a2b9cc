use std::collections::VecDeque;

use agentpulse_core::{Event, Gap, PulseError};

/// A bounded, ordered store of the most recent events, oldest evicted first.
///
/// The buffer owns the global sequence counter: numbers start at 1, are
/// strictly increasing, and are never reused even after eviction. Retained
/// events are always a contiguous suffix of the global sequence stream.
#[derive(Debug)]
pub struct EventLogBuffer {
    events: VecDeque<Event>,
    next_seq: u64,
    capacity: usize,
    max_payload_bytes: usize,
}

/// Result of a replay request: the retained events past a cursor, plus a
/// `Gap` when eviction already claimed part of the requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub events: Vec<Event>,
    pub gap: Option<Gap>,
}

impl EventLogBuffer {
    pub fn new(capacity: usize, max_payload_bytes: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            next_seq: 1,
            capacity,
            max_payload_bytes,
        }
    }

    /// Append a new event, assigning it the next sequence number.
    ///
    /// An oversized payload fails with `PayloadTooLarge` and stores nothing;
    /// the sequence counter does not advance for rejected events.
    pub fn append(
        &mut self,
        agent_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Event, PulseError> {
        let payload = payload.into();
        if payload.len() > self.max_payload_bytes {
            return Err(PulseError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload_bytes,
            });
        }

        let event = Event::new(self.next_seq, agent_id, payload);
        self.next_seq += 1;

        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        Ok(event)
    }

    /// All retained events with `seq > cursor`, ascending.
    ///
    /// When the cursor predates the oldest retained event, the returned `Gap`
    /// covers exactly the evicted range so callers can surface a "history
    /// truncated" notice instead of silently skipping.
    pub fn since(&self, cursor: u64) -> Replay {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.seq > cursor)
            .cloned()
            .collect();

        let gap = match self.oldest_seq() {
            Some(oldest) if cursor + 1 < oldest => Some(Gap::new(cursor + 1, oldest - 1)),
            // Empty buffer after evictions: everything past the cursor is gone.
            None if self.next_seq > cursor + 1 => Some(Gap::new(cursor + 1, self.next_seq - 1)),
            _ => None,
        };

        Replay { events, gap }
    }

    /// Sequence number of the oldest retained event, if any.
    pub fn oldest_seq(&self) -> Option<u64> {
        self.events.front().map(|e| e.seq)
    }

    /// Sequence number of the newest retained event, if any.
    pub fn latest_seq(&self) -> Option<u64> {
        self.events.back().map(|e| e.seq)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
