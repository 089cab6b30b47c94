//! Order book depth caches kept in sync with an exchange.
//!
//! [`DepthCacheManager`] combines a [`SnapshotSource`](connector_core::SnapshotSource)
//! and a [`DiffSource`](connector_core::DiffSource): for each tracked symbol it
//! opens the diff stream, buffers events while a snapshot is fetched, replaces
//! the cache with the snapshot, replays the buffer and then applies live
//! events. Progress is published as [`SyncEvent`]s.

mod config;
mod error;
mod events;
mod manager;
mod sequencer;
mod worker;

#[cfg(test)]
mod testing;

pub use config::SyncConfig;
pub use error::SyncError;
pub use events::SyncEvent;
pub use manager::DepthCacheManager;
