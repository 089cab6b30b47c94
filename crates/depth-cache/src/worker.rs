//! Per-symbol synchronization task.
//!
//! One worker owns every mutation of one symbol's cache:
//! 1. open the diff subscription
//! 2. request a snapshot, buffering diff events meanwhile
//! 3. replace the cache with the snapshot and replay the buffer in order
//! 4. apply live events until the stream ends or a gap forces step 2 again

use std::collections::VecDeque;
use std::sync::Arc;

use connector_core::{ConnectorError, DiffSource, DiffSubscription, SnapshotSource};
use metrics::SharedMetrics;
use model::{DepthEvent, DepthSnapshot};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::manager::SharedCache;
use crate::sequencer::{Sequencer, Verdict};

/// Result of feeding one event to the cache.
enum Step {
    Applied,
    Skipped,
    Gap { expected: u64, received: u64 },
}

/// Why the live phase stopped.
enum LiveExit {
    Resync(DepthEvent),
    Ended(ConnectorError),
}

pub(crate) struct SymbolWorker<S, D> {
    pub(crate) symbol: String,
    pub(crate) snapshot_source: Arc<S>,
    pub(crate) diff_source: Arc<D>,
    pub(crate) cache: SharedCache,
    pub(crate) config: SyncConfig,
    pub(crate) events: broadcast::Sender<SyncEvent>,
    pub(crate) metrics: SharedMetrics,
}

impl<S: SnapshotSource, D: DiffSource> SymbolWorker<S, D> {
    pub(crate) async fn run(self) {
        let mut subscription = match self.diff_source.subscribe(&self.symbol).await {
            Ok(subscription) => subscription,
            Err(e) => return self.fail(SyncError::Subscribe(e)),
        };
        self.metrics.inc_subscriptions_opened();
        info!(
            symbol = %self.symbol,
            stream = %subscription.stream_name(),
            "Diff stream opened"
        );

        let mut sequencer = Sequencer::new(self.config.verify_sequence);
        let mut buffer = VecDeque::new();

        loop {
            let snapshot = match self.fetch_while_buffering(&mut subscription, &mut buffer).await {
                Ok(snapshot) => snapshot,
                Err(e) => return self.fail(e),
            };

            let applied = self.cache.write().apply_snapshot(&snapshot);
            if let Err(e) = applied {
                return self.fail(SyncError::InvalidSnapshot(e));
            }
            sequencer.reset(snapshot.last_update_id);

            let replay_from = buffer.len();
            if let Some(rest) = self.replay(&mut buffer, &mut sequencer) {
                buffer = rest;
                continue;
            }

            info!(
                symbol = %self.symbol,
                last_update_id = ?snapshot.last_update_id,
                replayed = replay_from,
                "Depth cache synchronized"
            );
            self.notify(SyncEvent::Synchronized {
                symbol: self.symbol.clone(),
                last_update_id: snapshot.last_update_id,
                replayed: replay_from,
            });

            match self.run_live(&mut subscription, &mut sequencer).await {
                LiveExit::Resync(event) => buffer.push_back(event),
                LiveExit::Ended(e) => return self.fail(SyncError::StreamEnded(e)),
            }
        }
    }

    /// Await the snapshot while queueing diff events in receipt order.
    async fn fetch_while_buffering(
        &self,
        subscription: &mut DiffSubscription,
        buffer: &mut VecDeque<DepthEvent>,
    ) -> Result<DepthSnapshot, SyncError> {
        debug!(symbol = %self.symbol, "Requesting depth snapshot");
        let fetch = self.snapshot_source.fetch_snapshot(&self.symbol);
        tokio::pin!(fetch);

        loop {
            let has_room = buffer.len() < self.config.max_buffered_events;
            tokio::select! {
                biased;

                result = &mut fetch => {
                    return match result {
                        Ok(snapshot) => {
                            self.metrics.inc_snapshots_fetched();
                            Ok(snapshot)
                        }
                        Err(e) => {
                            self.metrics.inc_snapshots_failed();
                            Err(SyncError::Snapshot(e))
                        }
                    };
                }

                // A full buffer stops reading; the subscription queue then
                // holds further events until the snapshot lands.
                item = subscription.next(), if has_room => match item {
                    Some(Ok(event)) => {
                        buffer.push_back(event);
                        self.metrics.inc_events_buffered();
                        if buffer.len() == self.config.max_buffered_events {
                            warn!(
                                symbol = %self.symbol,
                                limit = self.config.max_buffered_events,
                                "Diff buffer full, pausing reads until the snapshot arrives"
                            );
                        }
                    }
                    Some(Err(e)) if e.is_recoverable() => self.reject(e.to_string()),
                    Some(Err(e)) => return Err(SyncError::StreamEnded(e)),
                    None => return Err(SyncError::StreamEnded(ConnectorError::ConnectionClosed)),
                },
            }
        }
    }

    /// Apply buffered events in order.
    ///
    /// On a gap, returns the gap event and everything after it so the next
    /// snapshot cycle can start from there.
    fn replay(
        &self,
        buffer: &mut VecDeque<DepthEvent>,
        sequencer: &mut Sequencer,
    ) -> Option<VecDeque<DepthEvent>> {
        while let Some(event) = buffer.pop_front() {
            if let Step::Gap { expected, received } = self.handle_event(&event, sequencer, false) {
                self.resyncing(expected, received);
                let mut rest = std::mem::take(buffer);
                rest.push_front(event);
                return Some(rest);
            }
        }
        None
    }

    async fn run_live(
        &self,
        subscription: &mut DiffSubscription,
        sequencer: &mut Sequencer,
    ) -> LiveExit {
        loop {
            match subscription.next().await {
                Some(Ok(event)) => {
                    if let Step::Gap { expected, received } =
                        self.handle_event(&event, sequencer, true)
                    {
                        self.resyncing(expected, received);
                        return LiveExit::Resync(event);
                    }
                }
                Some(Err(e)) if e.is_recoverable() => self.reject(e.to_string()),
                Some(Err(e)) => return LiveExit::Ended(e),
                None => return LiveExit::Ended(ConnectorError::ConnectionClosed),
            }
        }
    }

    fn handle_event(&self, event: &DepthEvent, sequencer: &mut Sequencer, live: bool) -> Step {
        if !event.symbol.eq_ignore_ascii_case(&self.symbol) {
            debug!(
                symbol = %self.symbol,
                received = %event.symbol,
                "Ignoring event for other symbol"
            );
            return Step::Skipped;
        }

        match sequencer.check(event) {
            Verdict::Apply => {}
            Verdict::Stale => {
                self.metrics.inc_events_stale();
                return Step::Skipped;
            }
            Verdict::Gap { expected, received } => return Step::Gap { expected, received },
        }

        // The lock is never held across an await.
        let result = self.cache.write().apply_event(event);
        match result {
            Ok(()) => {
                sequencer.advance(event);
                self.metrics.inc_events_applied();
                if live {
                    self.notify(SyncEvent::Updated {
                        symbol: self.symbol.clone(),
                        final_update_id: event.final_update_id,
                    });
                }
                Step::Applied
            }
            Err(e) => {
                self.reject(e.to_string());
                Step::Skipped
            }
        }
    }

    fn reject(&self, reason: String) {
        self.metrics.inc_events_rejected();
        warn!(symbol = %self.symbol, reason = %reason, "Diff event rejected");
        self.notify(SyncEvent::Rejected {
            symbol: self.symbol.clone(),
            reason,
        });
    }

    fn resyncing(&self, expected: u64, received: u64) {
        self.metrics.inc_sequence_gaps();
        warn!(
            symbol = %self.symbol,
            expected,
            received,
            "Depth sequence gap detected, re-syncing"
        );
        self.notify(SyncEvent::Resyncing {
            symbol: self.symbol.clone(),
            expected,
            received,
        });
    }

    fn fail(&self, error: SyncError) {
        if !matches!(error, SyncError::Subscribe(_)) {
            self.metrics.inc_subscriptions_closed();
        }
        warn!(symbol = %self.symbol, error = %error, "Depth cache synchronization stopped");
        self.notify(SyncEvent::Failed {
            symbol: self.symbol.clone(),
            error,
        });
    }

    fn notify(&self, event: SyncEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
