//! Single-consumer diff event queue.

use model::DepthEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ConnectorError;

/// One item of a diff subscription.
///
/// `Err(ConnectorError::Parse)` marks a rejected message and the stream goes on;
/// any other error is terminal and is the last item before the queue ends.
pub type DiffItem = Result<DepthEvent, ConnectorError>;

/// Producer half of a diff subscription.
pub type DiffSender = mpsc::Sender<DiffItem>;

/// A live, ordered, non-restartable sequence of diff events for one stream.
///
/// Dropping the subscription stops the task feeding it.
#[derive(Debug)]
pub struct DiffSubscription {
    stream: String,
    receiver: mpsc::Receiver<DiffItem>,
    feeder: Option<JoinHandle<()>>,
}

/// Create a subscription and the sender that feeds it.
pub fn diff_channel(stream: impl Into<String>, capacity: usize) -> (DiffSender, DiffSubscription) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, DiffSubscription::new(stream, rx))
}

impl DiffSubscription {
    pub fn new(stream: impl Into<String>, receiver: mpsc::Receiver<DiffItem>) -> Self {
        Self {
            stream: stream.into(),
            receiver,
            feeder: None,
        }
    }

    /// Tie the lifetime of the task producing events to this subscription.
    pub fn with_feeder(mut self, feeder: JoinHandle<()>) -> Self {
        self.feeder = Some(feeder);
        self
    }

    /// Stream name, e.g. `btcusdt@depth`.
    pub fn stream_name(&self) -> &str {
        &self.stream
    }

    /// Next item, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<DiffItem> {
        self.receiver.recv().await
    }

    /// Close the subscription and stop its producer.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.receiver.close();
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

impl Drop for DiffSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_items_arrive_in_send_order() {
        let (tx, mut sub) = diff_channel("btcusdt@depth", 8);
        assert_eq!(sub.stream_name(), "btcusdt@depth");

        for i in 1..=3u64 {
            let event = DepthEvent::new("BTCUSDT", vec![(dec!(100), dec!(1))], vec![])
                .with_update_ids(i, i);
            tx.send(Ok(event)).await.unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(item) = sub.next().await {
            seen.push(item.unwrap().first_update_id.unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_stops_feeder_and_rejects_sends() {
        let (tx, sub) = diff_channel("btcusdt@depth", 8);
        let feeder = tokio::spawn(std::future::pending::<()>());
        let sub = sub.with_feeder(feeder);

        sub.close();

        let result = tx.send(Err(ConnectorError::ConnectionClosed)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_drop_aborts_feeder() {
        let (_tx, sub) = diff_channel("ethusdt@depth", 1);
        let (guard_tx, guard_rx) = tokio::sync::oneshot::channel::<()>();
        let feeder = tokio::spawn(async move {
            let _guard = guard_tx;
            std::future::pending::<()>().await;
        });
        let sub = sub.with_feeder(feeder);
        drop(sub);

        // The aborted feeder drops its guard without sending.
        assert!(guard_rx.await.is_err());
    }
}
