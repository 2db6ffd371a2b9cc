use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use agentpulse_core::{Event, PulseError};

use crate::buffer::{EventLogBuffer, Replay};

/// The central fan-out engine.
///
/// `publish` appends to the event log and hands the event to every current
/// subscriber without waiting for any of them to drain it. Each subscriber
/// owns a bounded queue (the broadcast receiver); a slow subscriber loses its
/// own oldest undelivered events and is told how far it lagged, while other
/// subscribers and the publisher are unaffected.
pub struct BroadcastHub {
    buffer: Mutex<EventLogBuffer>,
    tx: broadcast::Sender<Event>,
}

/// Point-in-time counters for the status endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HubStats {
    pub retained_events: usize,
    pub oldest_seq: Option<u64>,
    pub latest_seq: Option<u64>,
    pub subscribers: usize,
}

impl BroadcastHub {
    /// `fanout_capacity` bounds each subscriber's outbound queue.
    pub fn new(buffer_capacity: usize, max_payload_bytes: usize, fanout_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(fanout_capacity);
        Self {
            buffer: Mutex::new(EventLogBuffer::new(buffer_capacity, max_payload_bytes)),
            tx,
        }
    }

    /// Ingest one event and fan it out to all current subscribers.
    ///
    /// Sequence assignment and fan-out happen under the same lock, so for any
    /// two publishes A then B, every subscriber observes A before B. The send
    /// never blocks on subscriber IO. A `PayloadTooLarge` failure drops only
    /// the offending event; the hub keeps serving subsequent publishes.
    pub async fn publish(
        &self,
        agent_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Event, PulseError> {
        let buffer = &mut *self.buffer.lock().await;
        let event = buffer.append(agent_id, payload)?;
        debug!(seq = event.seq, agent_id = %event.agent_id, "Event published");
        // No subscribers is fine; the event is still retained for replay.
        let _ = self.tx.send(event.clone());
        Ok(event)
    }

    /// Open a bounded live subscription. Dropping the receiver unregisters
    /// it; a publish racing with the drop simply finds no queue to fill.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Retained events past the given cursor, for handshake replay.
    /// `None` means "no cursor": the full retained buffer, no gap reported.
    pub async fn replay_since(&self, cursor: Option<u64>) -> Replay {
        let buffer = self.buffer.lock().await;
        match cursor {
            Some(cursor) => buffer.since(cursor),
            None => Replay {
                events: buffer.since(0).events,
                gap: None,
            },
        }
    }

    /// Newest assigned sequence number, if anything was ever published.
    pub async fn latest_seq(&self) -> Option<u64> {
        self.buffer.lock().await.latest_seq()
    }

    pub async fn stats(&self) -> HubStats {
        let buffer = self.buffer.lock().await;
        HubStats {
            retained_events: buffer.len(),
            oldest_seq: buffer.oldest_seq(),
            latest_seq: buffer.latest_seq(),
            subscribers: self.tx.receiver_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(100, 1024, 16)
    }

    #[tokio::test]
    async fn test_both_subscribers_receive_once_in_order() {
        let hub = hub();
        let mut s1 = hub.subscribe();
        let mut s2 = hub.subscribe();

        hub.publish("a1", "first").await.unwrap();
        hub.publish("a1", "second").await.unwrap();

        for rx in [&mut s1, &mut s2] {
            assert_eq!(rx.recv().await.unwrap().seq, 1);
            assert_eq!(rx.recv().await.unwrap().seq, 2);
            assert!(rx.try_recv().is_err()); // exactly once
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_never_reorders() {
        let hub = hub();
        hub.publish("a1", "before subscribe").await.unwrap();

        let mut rx = hub.subscribe();
        hub.publish("a1", "after subscribe").await.unwrap();

        // May miss seq 1, but the first live event is seq 2
        assert_eq!(rx.recv().await.unwrap().seq, 2);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_without_affecting_others() {
        // S1 never drains while 100 events burst through a queue of 16;
        // S2 keeps up and must see all 100 in order.
        let hub = BroadcastHub::new(200, 1024, 16);
        let mut s1 = hub.subscribe();
        let mut s2 = hub.subscribe();

        for i in 0..100 {
            hub.publish("a1", format!("burst {i}")).await.unwrap();
            // S2 drains inline, simulating a healthy consumer
            assert_eq!(s2.recv().await.unwrap().seq, i + 1);
        }

        // S1 overflowed: it learns how far it lagged, then resumes from the
        // oldest event still queued, never reordered.
        match s1.recv().await {
            Err(RecvError::Lagged(missed)) => assert!(missed > 0),
            other => panic!("expected lag, got {other:?}"),
        }
        let resumed = s1.recv().await.unwrap();
        assert!(resumed.seq > 1);
        let next = s1.recv().await.unwrap();
        assert_eq!(next.seq, resumed.seq + 1);

        // The buffer saw every event regardless of S1's congestion
        let stats = hub.stats().await;
        assert_eq!(stats.latest_seq, Some(100));
        assert_eq!(stats.retained_events, 100);
    }

    #[tokio::test]
    async fn test_publish_error_does_not_halt_fanout() {
        let hub = BroadcastHub::new(100, 8, 16);
        let mut rx = hub.subscribe();

        let err = hub.publish("a1", "far too large for this hub").await;
        assert!(matches!(
            err,
            Err(PulseError::PayloadTooLarge { max: 8, .. })
        ));

        let event = hub.publish("a1", "small").await.unwrap();
        assert_eq!(event.seq, 1);
        assert_eq!(rx.recv().await.unwrap().seq, 1);
    }

    #[tokio::test]
    async fn test_concurrent_publishers_unique_seqs() {
        use std::sync::Arc;

        let hub = Arc::new(BroadcastHub::new(1000, 1024, 256));
        let mut handles = Vec::new();
        for p in 0..8 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    hub.publish(format!("a{p}"), format!("msg {i}"))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let replay = hub.replay_since(Some(0)).await;
        let seqs: Vec<u64> = replay.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=400).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_replay_without_cursor_has_no_gap() {
        let hub = BroadcastHub::new(2, 1024, 16);
        for i in 0..4 {
            hub.publish("a1", format!("line {i}")).await.unwrap();
        }

        let fresh = hub.replay_since(None).await;
        assert_eq!(fresh.events.len(), 2);
        assert!(fresh.gap.is_none());

        let resumed = hub.replay_since(Some(0)).await;
        assert!(resumed.gap.is_some());
    }
}
