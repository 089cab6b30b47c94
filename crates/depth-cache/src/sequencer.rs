//! Update id continuity checks.
//!
//! Binance tags each diff event with `[U, u]` and each snapshot with
//! `lastUpdateId`. After a snapshot, events with `u <= lastUpdateId` are
//! already reflected and get dropped; the first applied event must satisfy
//! `U <= lastUpdateId + 1 <= u`, and every later event must start right after
//! the previous one. When either side carries no ids, every event applies.

use model::DepthEvent;

/// What to do with an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Apply,
    /// Already covered by the snapshot or a previous event.
    Stale,
    /// Events between `expected` and `received` are missing.
    Gap { expected: u64, received: u64 },
}

#[derive(Debug)]
pub(crate) struct Sequencer {
    verify: bool,
    last_update_id: Option<u64>,
}

impl Sequencer {
    pub(crate) fn new(verify: bool) -> Self {
        Self {
            verify,
            last_update_id: None,
        }
    }

    /// Start over from a snapshot.
    pub(crate) fn reset(&mut self, snapshot_update_id: Option<u64>) {
        self.last_update_id = snapshot_update_id;
    }

    pub(crate) fn check(&self, event: &DepthEvent) -> Verdict {
        if !self.verify {
            return Verdict::Apply;
        }
        let (Some(last), Some((first, final_id))) = (self.last_update_id, event.update_range())
        else {
            return Verdict::Apply;
        };

        if final_id <= last {
            Verdict::Stale
        } else if first <= last + 1 {
            Verdict::Apply
        } else {
            Verdict::Gap {
                expected: last + 1,
                received: first,
            }
        }
    }

    /// Record an applied event.
    pub(crate) fn advance(&mut self, event: &DepthEvent) {
        if let (Some(_), Some(final_id)) = (self.last_update_id, event.final_update_id) {
            self.last_update_id = Some(final_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(first: u64, last: u64) -> DepthEvent {
        DepthEvent::new("BTCUSDT", vec![], vec![]).with_update_ids(first, last)
    }

    #[test]
    fn test_without_snapshot_id_everything_applies() {
        let seq = Sequencer::new(true);
        assert_eq!(seq.check(&event(1, 2)), Verdict::Apply);
        assert_eq!(
            seq.check(&DepthEvent::new("BTCUSDT", vec![], vec![])),
            Verdict::Apply
        );
    }

    #[test]
    fn test_stale_events_after_snapshot() {
        let mut seq = Sequencer::new(true);
        seq.reset(Some(100));

        assert_eq!(seq.check(&event(90, 95)), Verdict::Stale);
        assert_eq!(seq.check(&event(96, 100)), Verdict::Stale);
    }

    #[test]
    fn test_first_event_may_straddle_snapshot() {
        let mut seq = Sequencer::new(true);
        seq.reset(Some(100));

        let straddling = event(98, 103);
        assert_eq!(seq.check(&straddling), Verdict::Apply);
        seq.advance(&straddling);

        assert_eq!(seq.check(&event(104, 104)), Verdict::Apply);
    }

    #[test]
    fn test_gap_detected() {
        let mut seq = Sequencer::new(true);
        seq.reset(Some(100));
        let first = event(101, 105);
        seq.advance(&first);

        assert_eq!(
            seq.check(&event(110, 112)),
            Verdict::Gap {
                expected: 106,
                received: 110
            }
        );
    }

    #[test]
    fn test_disabled_checks_apply_everything() {
        let mut seq = Sequencer::new(false);
        seq.reset(Some(100));
        assert_eq!(seq.check(&event(1, 2)), Verdict::Apply);
        assert_eq!(seq.check(&event(500, 600)), Verdict::Apply);
    }
}
