//! Per-session delivery bookkeeping.
//!
//! Tracks the highest seq actually sent to a viewer, the gap owed after
//! queue overflows, and how many overflows the session has suffered. Pure
//! state, driven by the connection task's live loop.

use agentpulse_core::Gap;

/// What the live loop should do with an incoming live event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Already delivered during replay; drop silently.
    Skip,
    /// Send the event, preceded by a gap frame when one is owed.
    Forward { gap: Option<Gap> },
}

/// Whether a queue overflow is still within the session's tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagOutcome {
    Tolerated,
    /// Strikes exceeded the threshold; force the disconnect.
    Disconnect,
}

#[derive(Debug)]
pub struct DeliveryCursor {
    last_sent: u64,
    pending_gap_from: Option<u64>,
    lag_strikes: u32,
    threshold: u32,
}

impl DeliveryCursor {
    pub fn new(start: u64, threshold: u32) -> Self {
        Self {
            last_sent: start,
            pending_gap_from: None,
            lag_strikes: 0,
            threshold,
        }
    }

    /// Where delivery resumes for a reconnecting viewer: the supplied cursor,
    /// clamped to the newest assigned seq. A cursor past the head (a stale
    /// viewer reconnecting after the counter reset) must resume from the live
    /// head, not swallow every event until the counter catches up.
    pub fn resume_point(cursor: Option<u64>, latest: Option<u64>) -> u64 {
        cursor.unwrap_or(0).min(latest.unwrap_or(0))
    }

    /// Record an event handed to the viewer during replay.
    pub fn advance(&mut self, seq: u64) {
        self.last_sent = seq;
    }

    pub fn last_sent(&self) -> u64 {
        self.last_sent
    }

    pub fn lag_strikes(&self) -> u32 {
        self.lag_strikes
    }

    /// Classify a live event against the cursor and any owed gap.
    pub fn on_event(&mut self, seq: u64) -> Delivery {
        if seq <= self.last_sent {
            return Delivery::Skip;
        }
        let gap = self
            .pending_gap_from
            .take()
            .filter(|from| *from < seq)
            .map(|from| Gap::new(from, seq - 1));
        self.last_sent = seq;
        Delivery::Forward { gap }
    }

    /// Record a queue overflow. The owed gap starts at the first undelivered
    /// seq and stays put across repeated overflows, so one gap frame covers
    /// the whole dropped range.
    pub fn on_overflow(&mut self) -> LagOutcome {
        self.lag_strikes += 1;
        self.pending_gap_from.get_or_insert(self.last_sent + 1);
        if self.lag_strikes > self.threshold {
            LagOutcome::Disconnect
        } else {
            LagOutcome::Tolerated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_overlap_skipped() {
        let mut cursor = DeliveryCursor::new(3, 8);
        assert_eq!(cursor.on_event(2), Delivery::Skip);
        assert_eq!(cursor.on_event(3), Delivery::Skip);
        assert_eq!(cursor.on_event(4), Delivery::Forward { gap: None });
        assert_eq!(cursor.last_sent(), 4);
    }

    #[test]
    fn test_overflow_synthesizes_covering_gap() {
        let mut cursor = DeliveryCursor::new(5, 8);
        assert_eq!(cursor.on_overflow(), LagOutcome::Tolerated);

        // Next delivered event is seq 9: the gap covers exactly 6..=8
        assert_eq!(
            cursor.on_event(9),
            Delivery::Forward {
                gap: Some(Gap::new(6, 8))
            }
        );
        // The gap was paid off; nothing owed on the next event
        assert_eq!(cursor.on_event(10), Delivery::Forward { gap: None });
    }

    #[test]
    fn test_contiguous_event_after_overflow_owes_no_gap() {
        let mut cursor = DeliveryCursor::new(5, 8);
        cursor.on_overflow();
        // Nothing was actually missed: seq 6 follows seq 5 directly
        assert_eq!(cursor.on_event(6), Delivery::Forward { gap: None });
    }

    #[test]
    fn test_repeated_overflows_coalesce_into_one_gap() {
        let mut cursor = DeliveryCursor::new(5, 8);
        cursor.on_overflow();
        cursor.on_overflow();
        cursor.on_overflow();
        assert_eq!(cursor.lag_strikes(), 3);
        assert_eq!(
            cursor.on_event(20),
            Delivery::Forward {
                gap: Some(Gap::new(6, 19))
            }
        );
    }

    #[test]
    fn test_overflow_threshold_forces_disconnect() {
        let mut cursor = DeliveryCursor::new(0, 2);
        assert_eq!(cursor.on_overflow(), LagOutcome::Tolerated);
        assert_eq!(cursor.on_overflow(), LagOutcome::Tolerated);
        assert_eq!(cursor.on_overflow(), LagOutcome::Disconnect);
    }

    #[test]
    fn test_stale_cursor_clamped_to_head() {
        // A viewer reconnecting with a cursor from before a counter reset
        // must resume from the live head, not skip events silently.
        assert_eq!(DeliveryCursor::resume_point(Some(100), Some(5)), 5);

        let mut cursor = DeliveryCursor::new(5, 8);
        assert_eq!(cursor.on_event(6), Delivery::Forward { gap: None });
    }

    #[test]
    fn test_resume_point_normal_cases() {
        assert_eq!(DeliveryCursor::resume_point(None, Some(5)), 0);
        assert_eq!(DeliveryCursor::resume_point(Some(3), Some(5)), 3);
        // Nothing ever published: any cursor resumes from the start
        assert_eq!(DeliveryCursor::resume_point(Some(2), None), 0);
    }
}
