/// Maximum number of events buffered while a snapshot is outstanding.
const DEFAULT_MAX_BUFFERED_EVENTS: usize = 1000;

/// Capacity of the [`SyncEvent`](crate::SyncEvent) broadcast channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Synchronizer settings shared by every tracked symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Events held while a snapshot is outstanding. Past this count the
    /// subscription is not read until the snapshot lands.
    pub max_buffered_events: usize,
    /// Check update id continuity when the exchange provides ids.
    pub verify_sequence: bool,
    /// Slow notification receivers lag past this many events.
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_buffered_events: DEFAULT_MAX_BUFFERED_EVENTS,
            verify_sequence: true,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl SyncConfig {
    pub fn without_sequence_checks(mut self) -> Self {
        self.verify_sequence = false;
        self
    }
}
