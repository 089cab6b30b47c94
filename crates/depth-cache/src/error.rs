use connector_core::ConnectorError;
use orderbook::OrderBookError;
use thiserror::Error;

/// Why a symbol stopped synchronizing.
///
/// The cache keeps its last state; tracking the symbol again restarts it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to open diff stream: {0}")]
    Subscribe(ConnectorError),

    #[error("snapshot request failed: {0}")]
    Snapshot(ConnectorError),

    #[error("snapshot rejected: {0}")]
    InvalidSnapshot(OrderBookError),

    #[error("diff stream ended: {0}")]
    StreamEnded(ConnectorError),
}
