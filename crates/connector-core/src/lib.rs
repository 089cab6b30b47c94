//! Source abstractions consumed by the depth cache.
//!
//! The synchronizer only needs two things from the outside world: a one-shot
//! order book snapshot and an ordered stream of diff events. Both are traits so
//! exchange connectors and in-process fakes plug in the same way.

mod error;
mod subscription;

use async_trait::async_trait;
use model::DepthSnapshot;

pub use error::ConnectorError;
pub use subscription::{diff_channel, DiffItem, DiffSender, DiffSubscription};

/// Something that can produce a point-in-time order book image.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch the full current book for `symbol`. No retry is implied.
    async fn fetch_snapshot(&self, symbol: &str) -> Result<DepthSnapshot, ConnectorError>;
}

/// Something that can open a live diff event subscription.
#[async_trait]
pub trait DiffSource: Send + Sync + 'static {
    /// Open the diff stream for `symbol`.
    ///
    /// Events are delivered in exchange order. The subscription never
    /// reconnects on its own; once it ends it stays ended.
    async fn subscribe(&self, symbol: &str) -> Result<DiffSubscription, ConnectorError>;
}
