//! In-process snapshot and diff sources for synchronizer tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use connector_core::{
    diff_channel, ConnectorError, DiffSender, DiffSource, DiffSubscription, SnapshotSource,
};
use model::DepthSnapshot;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::events::SyncEvent;

pub(crate) type SnapshotReply = Result<DepthSnapshot, ConnectorError>;

/// Hands out one scripted reply per request, waiting until the test sends it.
pub(crate) struct ScriptedSnapshots {
    replies: Mutex<mpsc::UnboundedReceiver<SnapshotReply>>,
    calls: AtomicUsize,
}

impl ScriptedSnapshots {
    pub(crate) fn new() -> (mpsc::UnboundedSender<SnapshotReply>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            replies: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        };
        (tx, source)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshots {
    async fn fetch_snapshot(&self, _symbol: &str) -> Result<DepthSnapshot, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(ConnectorError::Snapshot("no reply scripted".into())))
    }
}

/// Serves pre-built subscriptions in order; refuses once they run out.
pub(crate) struct QueuedStreams {
    subscriptions: parking_lot::Mutex<VecDeque<DiffSubscription>>,
}

impl QueuedStreams {
    pub(crate) fn new(count: usize) -> (Vec<DiffSender>, Self) {
        let mut senders = Vec::with_capacity(count);
        let mut subscriptions = VecDeque::with_capacity(count);
        for _ in 0..count {
            let (tx, subscription) = diff_channel("btcusdt@depth", 64);
            senders.push(tx);
            subscriptions.push_back(subscription);
        }
        let source = Self {
            subscriptions: parking_lot::Mutex::new(subscriptions),
        };
        (senders, source)
    }
}

#[async_trait]
impl DiffSource for QueuedStreams {
    async fn subscribe(&self, _symbol: &str) -> Result<DiffSubscription, ConnectorError> {
        self.subscriptions
            .lock()
            .pop_front()
            .ok_or_else(|| ConnectorError::WebSocket("connection refused".into()))
    }
}

pub(crate) async fn next_event(rx: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for sync event")
        .expect("sync event channel closed")
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
