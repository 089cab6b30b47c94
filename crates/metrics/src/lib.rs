use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe counters for depth stream ingestion and cache synchronization.
#[derive(Debug)]
pub struct SyncMetrics {
    // Stream
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    websocket_errors: AtomicU64,
    subscriptions_opened: AtomicU64,
    subscriptions_closed: AtomicU64,

    // Cache
    events_applied: AtomicU64,
    events_buffered: AtomicU64,
    events_rejected: AtomicU64,
    events_stale: AtomicU64,
    snapshots_fetched: AtomicU64,
    snapshots_failed: AtomicU64,
    sequence_gaps: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_update_time: Option<Instant>,
    last_error_time: Option<Instant>,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            websocket_errors: AtomicU64::new(0),
            subscriptions_opened: AtomicU64::new(0),
            subscriptions_closed: AtomicU64::new(0),
            events_applied: AtomicU64::new(0),
            events_buffered: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            events_stale: AtomicU64::new(0),
            snapshots_fetched: AtomicU64::new(0),
            snapshots_failed: AtomicU64::new(0),
            sequence_gaps: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_update_time: None,
                last_error_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        self.mark_error();
    }

    pub fn inc_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
        self.mark_error();
    }

    pub fn inc_subscriptions_opened(&self) {
        self.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_subscriptions_closed(&self) {
        self.subscriptions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_events_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_update_time = Some(Instant::now());
    }

    pub fn inc_events_buffered(&self) {
        self.events_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_events_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
        self.mark_error();
    }

    pub fn inc_events_stale(&self) {
        self.events_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_snapshots_fetched(&self) {
        self.snapshots_fetched.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_update_time = Some(Instant::now());
    }

    pub fn inc_snapshots_failed(&self) {
        self.snapshots_failed.fetch_add(1, Ordering::Relaxed);
        self.mark_error();
    }

    pub fn inc_sequence_gaps(&self) {
        self.sequence_gaps.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_error(&self) {
        self.inner.write().last_error_time = Some(Instant::now());
    }

    // --- Getter methods ---

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    pub fn websocket_errors(&self) -> u64 {
        self.websocket_errors.load(Ordering::Relaxed)
    }

    pub fn subscriptions_opened(&self) -> u64 {
        self.subscriptions_opened.load(Ordering::Relaxed)
    }

    pub fn subscriptions_closed(&self) -> u64 {
        self.subscriptions_closed.load(Ordering::Relaxed)
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied.load(Ordering::Relaxed)
    }

    pub fn events_buffered(&self) -> u64 {
        self.events_buffered.load(Ordering::Relaxed)
    }

    pub fn events_rejected(&self) -> u64 {
        self.events_rejected.load(Ordering::Relaxed)
    }

    pub fn events_stale(&self) -> u64 {
        self.events_stale.load(Ordering::Relaxed)
    }

    pub fn snapshots_fetched(&self) -> u64 {
        self.snapshots_fetched.load(Ordering::Relaxed)
    }

    pub fn snapshots_failed(&self) -> u64 {
        self.snapshots_failed.load(Ordering::Relaxed)
    }

    pub fn sequence_gaps(&self) -> u64 {
        self.sequence_gaps.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_update(&self) -> Option<f64> {
        self.inner
            .read()
            .last_update_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Applied events per second since start.
    pub fn events_per_second(&self) -> f64 {
        let uptime = self.uptime_secs();
        if uptime > 0.0 {
            self.events_applied() as f64 / uptime
        } else {
            0.0
        }
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received(),
            parse_errors: self.parse_errors(),
            websocket_errors: self.websocket_errors(),
            subscriptions_opened: self.subscriptions_opened(),
            subscriptions_closed: self.subscriptions_closed(),
            events_applied: self.events_applied(),
            events_buffered: self.events_buffered(),
            events_rejected: self.events_rejected(),
            events_stale: self.events_stale(),
            snapshots_fetched: self.snapshots_fetched(),
            snapshots_failed: self.snapshots_failed(),
            sequence_gaps: self.sequence_gaps(),
            uptime_secs: self.uptime_secs(),
            events_per_second: self.events_per_second(),
            secs_since_last_update: self.secs_since_last_update(),
            secs_since_last_error: self.secs_since_last_error(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub parse_errors: u64,
    pub websocket_errors: u64,
    pub subscriptions_opened: u64,
    pub subscriptions_closed: u64,
    pub events_applied: u64,
    pub events_buffered: u64,
    pub events_rejected: u64,
    pub events_stale: u64,
    pub snapshots_fetched: u64,
    pub snapshots_failed: u64,
    pub sequence_gaps: u64,
    pub uptime_secs: f64,
    pub events_per_second: f64,
    pub secs_since_last_update: Option<f64>,
    pub secs_since_last_error: Option<f64>,
}

/// Health status of the depth feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Caches are being updated.
    Healthy,
    /// No update for a while.
    Degraded,
    /// No update for an extended period.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Threshold in seconds for considering data stale (degraded).
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    /// Threshold in seconds for considering the feed unhealthy.
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    /// Determine the health status from the time since the last cache update.
    pub fn health_status(&self) -> HealthStatus {
        // Before the first update, judge by how long we have been running.
        let idle_secs = self.secs_since_last_update.unwrap_or(self.uptime_secs);

        if idle_secs > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if idle_secs > Self::STALE_THRESHOLD_SECS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Depth Cache Metrics ===")?;
        writeln!(f, "Uptime:                {:.1}s", self.uptime_secs)?;
        writeln!(f, "Messages received:     {}", self.messages_received)?;
        writeln!(f, "Events applied:        {}", self.events_applied)?;
        writeln!(f, "Events/sec:            {:.2}", self.events_per_second)?;
        writeln!(f, "Events buffered:       {}", self.events_buffered)?;
        writeln!(f, "Events rejected:       {}", self.events_rejected)?;
        writeln!(f, "Events stale:          {}", self.events_stale)?;
        writeln!(f, "Snapshots fetched:     {}", self.snapshots_fetched)?;
        writeln!(f, "Snapshots failed:      {}", self.snapshots_failed)?;
        writeln!(f, "Sequence gaps:         {}", self.sequence_gaps)?;
        writeln!(f, "Parse errors:          {}", self.parse_errors)?;
        writeln!(f, "WebSocket errors:      {}", self.websocket_errors)?;
        writeln!(f, "Subscriptions opened:  {}", self.subscriptions_opened)?;
        writeln!(f, "Subscriptions closed:  {}", self.subscriptions_closed)?;
        if let Some(secs) = self.secs_since_last_update {
            writeln!(f, "Since last update:     {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:      {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<SyncMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(SyncMetrics::new())
}
