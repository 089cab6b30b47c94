//! Notifications published by the synchronizer.

use crate::error::SyncError;

/// State change of one tracked symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A snapshot was applied and the buffered events replayed.
    Synchronized {
        symbol: String,
        last_update_id: Option<u64>,
        replayed: usize,
    },
    /// A live diff event was applied.
    Updated {
        symbol: String,
        final_update_id: Option<u64>,
    },
    /// A diff event was malformed or invalid and changed nothing.
    Rejected { symbol: String, reason: String },
    /// An update id gap was seen; a fresh snapshot is being fetched.
    Resyncing {
        symbol: String,
        expected: u64,
        received: u64,
    },
    /// Synchronization stopped for this symbol.
    Failed { symbol: String, error: SyncError },
}

impl SyncEvent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Synchronized { symbol, .. }
            | Self::Updated { symbol, .. }
            | Self::Rejected { symbol, .. }
            | Self::Resyncing { symbol, .. }
            | Self::Failed { symbol, .. } => symbol,
        }
    }
}
